use std::io::Read;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};
use sorts_tui::api::{Client, ClientConfig};
use sorts_tui::controller::{Controller, Services};
use sorts_tui::data::{ApiCommentService, ApiFeedService, ApiModerationService};
use tiny_http::{Method, Response, Server};

const WAIT: Duration = Duration::from_secs(10);

fn spawn_api() -> String {
    let server = Server::http("127.0.0.1:0").expect("bind test server");
    let addr = server.server_addr().to_ip().expect("ip listener");
    thread::spawn(move || {
        for mut request in server.incoming_requests() {
            let mut body = String::new();
            let _ = request.as_reader().read_to_string(&mut body);
            let method = request.method().clone();
            let url = request.url().to_string();
            let response = match (method, url.as_str()) {
                (Method::Get, "/api/challenges") => Response::from_string(
                    json!([
                        {"id": 1, "title": "Jump rope", "videoUrl": "https://cdn.test/1.mp4", "likeNum": 3},
                        {"id": 2, "title": "Handstand", "videoUrl": "https://cdn.test/2.mp4", "likeNum": 0}
                    ])
                    .to_string(),
                ),
                (Method::Get, "/api/comments/1") => Response::from_string(
                    json!([{"id": 10, "nickname": "mina", "comment": "wow"}]).to_string(),
                ),
                (Method::Get, path) if path.starts_with("/api/comments/") => {
                    Response::from_string("[]")
                }
                (Method::Post, "/api/comments") => {
                    let payload: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
                    Response::from_string(
                        json!({
                            "id": 11,
                            "nickname": payload["nickname"],
                            "comment": payload["comment"],
                        })
                        .to_string(),
                    )
                }
                (Method::Delete, path) if path.starts_with("/api/challenges/") => {
                    let payload: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
                    if payload["password"] == "letmein" {
                        Response::from_string("").with_status_code(204)
                    } else {
                        Response::from_string("forbidden").with_status_code(403)
                    }
                }
                _ => Response::from_string("not found").with_status_code(404),
            };
            let _ = request.respond(response);
        }
    });
    format!("http://{addr}")
}

fn controller(base_url: String) -> Controller {
    let client = Arc::new(
        Client::new(ClientConfig {
            base_url,
            user_agent: "sorts-tui-test".into(),
            timeout: Some(Duration::from_secs(5)),
            http_client: None,
        })
        .expect("client"),
    );
    Controller::new(Services {
        feed: Arc::new(ApiFeedService::new(client.clone())),
        comments: Arc::new(ApiCommentService::new(client.clone())),
        moderation: Arc::new(ApiModerationService::new(client)),
    })
}

#[test]
fn browse_comment_and_delete_against_http_api() {
    let mut controller = controller(spawn_api());

    controller.load_feed();
    assert!(controller.wait_idle(WAIT));
    assert_eq!(controller.feed().items().len(), 2);
    assert_eq!(controller.feed().comments()[0].text, "wow");

    assert!(controller.submit_comment("jun", "nice form"));
    assert!(controller.wait_idle(WAIT));
    assert_eq!(controller.feed().comments().len(), 2);
    assert_eq!(controller.feed().comments()[1].nickname, "jun");

    assert!(controller.delete_item("nope"));
    assert!(controller.wait_idle(WAIT));
    assert_eq!(controller.feed().items().len(), 2);
    assert!(controller.last_error().unwrap().contains("403"));

    assert!(controller.delete_item("letmein"));
    assert!(controller.wait_idle(WAIT));
    assert_eq!(controller.feed().items().len(), 1);
    assert_eq!(controller.feed().focused_id(), Some(2));
}
