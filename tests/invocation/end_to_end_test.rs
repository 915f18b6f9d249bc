//! Full token + send round trip over real HTTP to a local stub gateway.

use wechat_notify::config::GatewayConfig;
use wechat_notify::gateway::{Endpoints, ReqwestTransport};
use wechat_notify::invocation::{Invocation, NotifyParams};

use crate::http_stub::{closed_port_url, request_body, serve};

fn params() -> NotifyParams {
    NotifyParams {
        corp_id: Some("123".to_owned()),
        secret: Some("456".to_owned()),
        agent_id: Some("100001".to_owned()),
        msg: Some("Ansible task finished".to_owned()),
        ..NotifyParams::default()
    }
}

#[tokio::test]
async fn delivers_through_stub_gateway() {
    let (base, server) = serve(vec![
        (
            "200 OK",
            r#"{"errcode":0,"errmsg":"ok","access_token":"tok-e2e","expires_in":7200}"#.to_owned(),
        ),
        (
            "200 OK",
            r#"{"errcode":0,"errmsg":"ok","invaliduser":""}"#.to_owned(),
        ),
    ])
    .await;
    let endpoints = Endpoints::new(&base).expect("stub base is valid");
    let transport = ReqwestTransport::default();

    let report = Invocation::new(&transport, &endpoints).run(params()).await;
    assert!(report.changed, "unexpected report: {report:?}");
    assert_eq!(report.touser.as_deref(), Some("@all"));

    let requests = server.await.expect("server task joins");
    assert_eq!(requests.len(), 2);
    assert!(requests[0].starts_with("GET /cgi-bin/gettoken?corpid=123&corpsecret=456 "));
    assert!(requests[1].starts_with("POST /cgi-bin/message/send?access_token=tok-e2e "));

    let body: serde_json::Value =
        serde_json::from_str(request_body(&requests[1])).expect("send body is json");
    assert_eq!(body["msgtype"], "text");
    assert_eq!(body["agentid"], "100001");
    assert_eq!(body["safe"], 0);
    assert_eq!(body["touser"], "@all");
}

#[tokio::test]
async fn unreachable_gateway_is_reported_not_raised() {
    let base = closed_port_url().await;
    let endpoints = Endpoints::new(&base).expect("base is valid");
    let transport = ReqwestTransport::new(&GatewayConfig {
        base_url: base.clone(),
        connect_timeout_secs: Some(5),
        request_timeout_secs: Some(10),
    });

    let report = Invocation::new(&transport, &endpoints).run(params()).await;
    assert!(report.failed);
    assert!(!report.changed);
    let detail = report.error_detail.expect("failure carries detail");
    assert!(detail.starts_with("token request failed"));
    assert!(!detail.contains("corpsecret=456"));
}
