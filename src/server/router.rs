use log::error;

use super::http::{Request, Response, Status};
use crate::{
    stress::{StressTestController, Version},
    Result,
};

pub fn route(controller: &StressTestController, request: &Request) -> Response {
    let Some(version) = Version::from_path(&request.target) else {
        return Response::new(Status::NotFound, format!("no endpoint at {}", request.target));
    };
    if request.method != "GET" {
        return Response::new(
            Status::MethodNotAllowed,
            format!("{} only answers GET", version.path()),
        );
    }
    respond(version, controller.instance_id(), controller.handle(version))
}

/// Turns a handler outcome into the response sent back, failures included.
fn respond(version: Version, instance_id: u64, outcome: Result<String>) -> Response {
    let response = match outcome {
        Ok(body) => Response::ok(body),
        Err(e) => {
            error!("{version} failed on instance {instance_id}: {e}");
            Response::new(Status::InternalServerError, e.to_string())
        }
    };
    response.with_instance(instance_id)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        stress::{is_well_formed, ControllerDelays},
        Error,
    };

    fn get(target: &str) -> Request {
        Request {
            method: "GET".to_string(),
            target: target.to_string(),
        }
    }

    #[test]
    fn dispatches_to_each_version() {
        let controller = StressTestController::new(ControllerDelays {
            v3: Duration::from_millis(1),
            v4: Duration::from_millis(1),
        });
        for version in Version::ALL {
            let response = route(&controller, &get(version.path()));
            assert_eq!(response.status, Status::Ok);
            assert_eq!(response.instance_id, Some(controller.instance_id()));
            assert!(is_well_formed(&response.body[response.body.len() - 10..]));
        }
    }

    #[test]
    fn unknown_paths_and_methods_are_rejected() {
        let controller = StressTestController::new(ControllerDelays::default());
        assert_eq!(route(&controller, &get("/v9")).status, Status::NotFound);

        let post = Request {
            method: "POST".to_string(),
            target: "/v1".to_string(),
        };
        assert_eq!(route(&controller, &post).status, Status::MethodNotAllowed);
    }

    #[test]
    fn modified_while_reading_becomes_a_server_error() {
        let failure = Error::ConcurrentModification {
            expected: 12,
            found: 17,
        };
        let text = failure.to_string();
        let response = respond(Version::V3, 4, Err(failure));
        assert_eq!(response.status, Status::InternalServerError);
        assert_eq!(response.body, text);
        assert_eq!(response.instance_id, Some(4));

        let bytes = String::from_utf8(response.to_bytes()).unwrap();
        assert!(bytes.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(bytes.ends_with(&text));
    }
}
