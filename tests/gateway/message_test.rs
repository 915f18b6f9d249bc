//! Payload construction, response checks, and sending.

use serde_json::json;
use wechat_notify::gateway::message::parse_send_response;
use wechat_notify::gateway::{
    AccessToken, Endpoints, HttpReply, MessageSender, Recipients, SendError, TextMessage,
    ALL_USERS, DEFAULT_BASE_URL,
};

use crate::fake_transport::{FakeTransport, Recorded};

fn payload_json(recipients: Recipients) -> serde_json::Value {
    let message = TextMessage::new("100001", "Ansible task finished", recipients);
    serde_json::to_value(message.payload()).expect("payload serializes")
}

fn reply(status: u16, body: &str) -> HttpReply {
    HttpReply {
        status,
        body: body.to_owned(),
    }
}

fn some(value: &str) -> Option<String> {
    Some(value.to_owned())
}

// ── Recipients ──

#[test]
fn no_selectors_resolve_to_everyone() {
    let recipients = Recipients::resolve(None, None, None);
    assert_eq!(recipients.touser(), Some(ALL_USERS));
    assert_eq!(recipients.toparty(), None);
    assert_eq!(recipients.totag(), None);
}

#[test]
fn department_only_does_not_add_everyone() {
    let recipients = Recipients::resolve(None, some("10"), None);
    assert_eq!(recipients.touser(), None);
    assert_eq!(recipients.toparty(), Some("10"));
    assert!(!recipients.is_everyone());
}

// ── Payload ──

#[test]
fn everyone_payload_has_fixed_fields_and_no_party_or_tag() {
    let payload = payload_json(Recipients::resolve(None, None, None));
    assert_eq!(
        payload,
        json!({
            "msgtype": "text",
            "agentid": "100001",
            "text": {"content": "Ansible task finished"},
            "safe": 0,
            "touser": "@all"
        })
    );
}

#[test]
fn user_list_passes_through_verbatim() {
    let payload = payload_json(Recipients::resolve(
        some("LeWork|LeWork1|LeWork2"),
        None,
        None,
    ));
    assert_eq!(payload["touser"], json!("LeWork|LeWork1|LeWork2"));
}

#[test]
fn party_without_tag_omits_totag() {
    let payload = payload_json(Recipients::resolve(None, some("10|11"), None));
    assert_eq!(payload["toparty"], json!("10|11"));
    assert!(payload.get("totag").is_none());
    assert!(payload.get("touser").is_none());
}

#[test]
fn party_with_tag_attaches_both() {
    let payload = payload_json(Recipients::resolve(None, some("10"), some("dev")));
    assert_eq!(payload["toparty"], json!("10"));
    assert_eq!(payload["totag"], json!("dev"));
}

#[test]
fn tag_without_party_is_not_attached() {
    let payload = payload_json(Recipients::resolve(some("LeWork"), None, some("dev")));
    assert_eq!(payload["touser"], json!("LeWork"));
    assert!(payload.get("totag").is_none());

    let tag_only = payload_json(Recipients::resolve(None, None, some("dev")));
    assert!(tag_only.get("totag").is_none());
    assert!(tag_only.get("touser").is_none());
}

// ── Response checks ──

#[test]
fn invalid_user_fails_despite_http_200() {
    let err = parse_send_response(&reply(
        200,
        r#"{"errcode":0,"errmsg":"ok","invaliduser":"LeWork"}"#,
    ))
    .expect_err("invalid user reported");
    assert!(matches!(&err, SendError::InvalidUser(u) if u == "LeWork"));
    assert_eq!(err.to_string(), "invalid user: LeWork");
}

#[test]
fn bare_invaliduser_body_fails() {
    let err = parse_send_response(&reply(200, r#"{"invaliduser":"LeWork"}"#))
        .expect_err("invalid user reported");
    assert_eq!(err.to_string(), "invalid user: LeWork");
}

#[test]
fn invalid_user_wins_over_errcode() {
    let err = parse_send_response(&reply(
        200,
        r#"{"errcode":81013,"errmsg":"user & party & tag all invalid","invaliduser":"ghost"}"#,
    ))
    .expect_err("nothing resolved");
    assert!(matches!(err, SendError::InvalidUser(u) if u == "ghost"));
}

#[test]
fn empty_invaliduser_is_success() {
    let receipt = parse_send_response(&reply(
        200,
        r#"{"errcode":0,"errmsg":"ok","invaliduser":"","msgid":"m-1"}"#,
    ))
    .expect("delivery accepted");
    assert_eq!(receipt.msgid.as_deref(), Some("m-1"));
    assert_eq!(receipt.invalid_users(), None);
}

#[test]
fn invalid_party_alone_is_not_a_failure() {
    let receipt = parse_send_response(&reply(
        200,
        r#"{"errcode":0,"errmsg":"ok","invaliduser":"","invalidparty":"99"}"#,
    ))
    .expect("only parties unresolved");
    assert_eq!(receipt.invalid_parties(), Some("99"));
}

#[test]
fn nonzero_errcode_is_api_error() {
    let err = parse_send_response(&reply(
        200,
        r#"{"errcode":40014,"errmsg":"invalid access_token"}"#,
    ))
    .expect_err("token rejected");
    assert!(matches!(err, SendError::Api { errcode: 40014, .. }));
    assert_eq!(err.to_string(), "gateway error 40014: invalid access_token");
}

#[test]
fn error_status_is_status_error() {
    let err = parse_send_response(&reply(503, "busy")).expect_err("non-2xx");
    assert!(matches!(err, SendError::Status { status: 503, .. }));
}

#[test]
fn non_json_body_is_malformed() {
    let err = parse_send_response(&reply(200, "not json")).expect_err("garbage body");
    assert!(matches!(err, SendError::MalformedResponse { .. }));
}

// ── Sender ──

#[tokio::test]
async fn send_posts_payload_with_token_query() {
    let transport =
        FakeTransport::new().reply(200, r#"{"errcode":0,"errmsg":"ok","invaliduser":""}"#);
    let endpoints = Endpoints::new(DEFAULT_BASE_URL).expect("valid base");
    let message = TextMessage::new("100001", "hello", Recipients::resolve(None, None, None));

    MessageSender::new(&transport, &endpoints)
        .send(&AccessToken::new("tok-1"), &message)
        .await
        .expect("send succeeds");

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url().path(), "/cgi-bin/message/send");
    assert_eq!(requests[0].query("access_token").as_deref(), Some("tok-1"));
    match &requests[0] {
        Recorded::Post(_, body) => {
            assert_eq!(body["touser"], json!("@all"));
            assert_eq!(body["text"]["content"], json!("hello"));
        }
        other => panic!("expected a POST, got: {other:?}"),
    }
}

#[tokio::test]
async fn sending_twice_makes_two_requests() {
    let ok = r#"{"errcode":0,"errmsg":"ok","invaliduser":""}"#;
    let transport = FakeTransport::new().reply(200, ok).reply(200, ok);
    let endpoints = Endpoints::new(DEFAULT_BASE_URL).expect("valid base");
    let message = TextMessage::new("100001", "hello", Recipients::everyone());
    let sender = MessageSender::new(&transport, &endpoints);
    let token = AccessToken::new("tok-1");

    sender.send(&token, &message).await.expect("first send");
    sender.send(&token, &message).await.expect("second send");

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0], requests[1]);
}

#[tokio::test]
async fn send_transport_failure_is_send_error() {
    let transport = FakeTransport::new().fail("connection reset");
    let endpoints = Endpoints::new(DEFAULT_BASE_URL).expect("valid base");
    let message = TextMessage::new("100001", "hello", Recipients::everyone());

    let err = MessageSender::new(&transport, &endpoints)
        .send(&AccessToken::new("tok-1"), &message)
        .await
        .expect_err("transport failed");
    assert!(matches!(err, SendError::Transport(_)));
    assert_eq!(err.to_string(), "send request failed: connection reset");
}
