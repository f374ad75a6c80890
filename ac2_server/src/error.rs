use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use error_chain::error_chain;
use reveal::error::ErrorKind as RevealKind;
use serde::Serialize;

error_chain! {
    links {
        Reveal(reveal::error::Error, reveal::error::ErrorKind);
    }

    foreign_links {
        Sled(sled::Error);
        Json(serde_json::Error);
        Io(std::io::Error);
        Config(figment::Error);
    }

    errors{
        NotFound(id: String) {
            description("Objective not found")
            display("Objective not found.")
        }
        NotInvited {
            description("Name is not on the invite list")
            display("Not invited. Ignored")
        }
        AlreadyCommitted {
            description("Name already committed")
            display("This name has already committed to the objective.")
        }
        ObjectiveClosed {
            description("Objective closed")
            display("This objective has already resolved.")
        }
        DeadlinePassed {
            description("Resolution date passed")
            display("The resolution date has been passed.")
        }
        Validation(t: String) {
            description("Invalid request")
            display("{}", t)
        }
    }
}

#[derive(Serialize)]
pub struct MessageBody {
    pub message: String,
}

impl Error {
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    // internal failures are logged, never echoed
    fn public_message(&self) -> String {
        if self.is_client_error() {
            self.to_string()
        } else {
            "Internal error.".to_owned()
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound(_) => StatusCode::NOT_FOUND,
            ErrorKind::NotInvited => StatusCode::FORBIDDEN,
            ErrorKind::AlreadyCommitted | ErrorKind::ObjectiveClosed | ErrorKind::DeadlinePassed => {
                StatusCode::CONFLICT
            }
            ErrorKind::Validation(_) => StatusCode::BAD_REQUEST,
            ErrorKind::Reveal(RevealKind::InvalidChoice(_))
            | ErrorKind::Reveal(RevealKind::InvalidParameterSet(_, _))
            | ErrorKind::Reveal(RevealKind::Common(common::error::ErrorKind::InvalidDegree(_, _))) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if !self.is_client_error() {
            tracing::error!(error = %self, "request failed");
        }
        HttpResponse::build(self.status_code()).json(MessageBody {
            message: self.public_message(),
        })
    }
}
