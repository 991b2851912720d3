mod dispatch_tests;
