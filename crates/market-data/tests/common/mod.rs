//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use quotefeed_market_data::{MarketDataError, Transport, TransportRequest, TransportResponse};

pub const SINA_LINE: &str = "山东路桥,10.50,10.40,10.55,10.60,10.35,10.54,10.55,1000000,10550000,12000,10.54,8000,10.53,6000,10.52,4000,10.51,3000,10.50,10000,10.55,9000,10.56,7000,10.57,5000,10.58,2000,10.59,2024-03-15,15:00:03,00";

pub const TENCENT_LINE: &str = "51~山东路桥~000498~10.55~10.40~10.50~10000~5000~5000~10.54~120~10.53~80~10.52~60~10.51~40~10.50~30~10.55~100~10.56~90~10.57~70~10.58~50~10.59~20~~20240315150003~0.15~1.44~10.60~10.35~10.55/10000/10550000~10000~1055~0.64~8.50~~10.60~10.35~2.40~163.80~163.80~1.05~11.44~9.36~";

pub const EASTMONEY_V1_BODY: &str = r#"{"rc":0,"rt":4,"data":{"f43":0.64,"f44":10.55,"f45":10.6,"f46":10.35,"f47":10.5,"f48":10.4,"f49":0.15,"f50":1.44,"f51":1000000,"f52":10550000.0,"f55":2.4,"f57":8.5,"f58":"山东路桥","f116":16380000000.0,"f117":16380000000.0,"f167":1.05,"f168":0.64}}"#;

pub const EASTMONEY_V2_BODY: &str = r#"{"rc":0,"rt":4,"data":{"f44":1055,"f45":1060,"f46":1035,"f47":1050,"f48":1040,"f49":15,"f50":144,"f51":1000000,"f52":10550000,"f55":240,"f57":8.5,"f58":"山东路桥","f116":16380000000,"f117":16380000000,"f167":1.05,"f168":64}}"#;

pub const SINA_CENTER_BODY: &str = r#"[{"symbol":"sz000498","code":"000498","name":"山东路桥","trade":"10.550","pricechange":"0.150","changepercent":"1.442","settlement":"10.400","open":"10.500","high":"10.600","low":"10.350","volume":1000000,"amount":10550000,"mktcap":1638000,"nmc":1638000,"per":8.5,"pb":1.05,"turnoverratio":0.64}]"#;

/// Daily chart for 2024-03-12 to 2024-03-15; 03-13 has a null open.
pub const YAHOO_CHART_BODY: &str = r#"{"chart":{"result":[{"meta":{"currency":"CNY","symbol":"000498.SZ","exchangeName":"SHZ","instrumentType":"EQUITY","gmtoffset":28800,"timezone":"CST"},"timestamp":[1710207000,1710293400,1710379800,1710466200],"indicators":{"quote":[{"open":[10.2,null,10.35,10.5],"high":[10.4,10.45,10.5,10.6],"low":[10.1,10.25,10.3,10.35],"close":[10.3,10.35,10.4,10.55],"volume":[900000,950000,980000,1000000]}]}}],"error":null}}"#;

pub fn sina_body(line: &str) -> String {
    format!("var hq_str_sz000498=\"{}\";\n", line)
}

pub fn tencent_body(line: &str) -> String {
    format!("v_sz000498=\"{}\";\n", line)
}

pub fn gb18030(text: &str) -> Vec<u8> {
    let (bytes, _, _) = encoding_rs::GB18030.encode(text);
    bytes.into_owned()
}

#[derive(Clone)]
pub enum Reply {
    Body(u16, Vec<u8>),
    Fail,
    Timeout,
}

impl Reply {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Reply::Body(200, body.into())
    }
}

/// In-memory transport answering by provider id, recording call order.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: HashMap<String, Reply>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, provider: &str, reply: Reply) -> Self {
        self.replies.insert(provider.to_string(), reply);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, request: &TransportRequest) -> Result<TransportResponse, MarketDataError> {
        self.calls.lock().unwrap().push(request.provider.to_string());
        match self.replies.get(&*request.provider) {
            Some(Reply::Body(status, body)) => Ok(TransportResponse {
                status: *status,
                body: body.clone(),
            }),
            Some(Reply::Timeout) => Err(MarketDataError::Timeout {
                provider: request.provider.to_string(),
            }),
            Some(Reply::Fail) | None => Err(MarketDataError::Transport {
                provider: request.provider.to_string(),
                message: "connection reset by peer".to_string(),
            }),
        }
    }
}
