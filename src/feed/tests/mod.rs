mod decoder_tests;
mod mapper_tests;

/// Recorded compact frames in the documented stream schema. Price/qty
/// decimals stay within the default symbol scale (price 0.1, qty 0.001).
pub(super) const DEPTH_FRAME: &str = r#"{"stream":"btcusdc@depth","data":{"e":"depthUpdate","E":1700000001234,"T":1700000001230,"s":"BTCUSDC","U":100,"u":109,"pu":99,"b":[["98234.1","0.525"],["98234.0","1.2"],["98233.9","0"]],"a":[["98235.2","0.75"],["98235.3","2"]]}}"#;

pub(super) const TRADE_FRAME: &str = r#"{"stream":"btcusdc@aggTrade","data":{"e":"aggTrade","E":1700000002345,"a":88111,"s":"BTCUSDC","p":"98234.5","q":"0.125","f":7001,"l":7003,"T":1700000002340,"m":false}}"#;

pub(super) const TRADE_FRAME_MAKER: &str = r#"{"stream":"btcusdc@aggTrade","data":{"e":"aggTrade","E":1700000002350,"a":88112,"s":"BTCUSDC","p":"98234.4","q":"0.5","f":7004,"l":7004,"T":1700000002348,"m":true}}"#;

pub(super) const BOOK_TICKER_FRAME: &str = r#"{"stream":"btcusdc@bookTicker","data":{"e":"bookTicker","u":555123,"s":"BTCUSDC","b":"98234.1","B":"0.525","a":"98235.2","A":"0.75","T":1700000003456,"E":1700000003460}}"#;

pub(super) const SNAPSHOT_FRAME: &str = r#"{"id":"snapshot_BTCUSDC","status":200,"result":{"lastUpdateId":25,"E":1700000004567,"T":1700000004560,"bids":[["98230.0","3"],["98229.5","1.5"]],"asks":[["98231.0","2.25"]]}}"#;

pub(super) const API_ERROR_FRAME: &str =
    r#"{"id":"abc-1","status":400,"error":{"code":-1121,"msg":"Invalid symbol."}}"#;

pub(super) const EXCHANGE_INFO_FRAME: &str = r#"{"timezone":"UTC","serverTime":1700000005000,"symbols":[{"symbol":"BTCUSDC","quoteAsset":"USDC","filters":[{"filterType":"PRICE_FILTER","tickSize":"0.1"},{"filterType":"LOT_SIZE","minQty":"0.001","maxQty":"900","stepSize":"0.001"}]}]}"#;
