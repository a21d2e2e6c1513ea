use std::fmt::{self, Display, Formatter};

/// Outcome of a network-config request, surfaced to the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestResult {
    /// Request accepted, dictionary populated and signed.
    Ok,
    /// Member already holds the current revision; no payload.
    OkButNotNewer,
    /// No such network on this controller.
    ObjectNotFound,
    /// Requester is not (or not yet) authorized, or its identity does not
    /// match the one bound to its address.
    AccessDenied,
    /// Store or signing failure; the dictionary carries an `error` key.
    InternalServerError,
}

impl RequestResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestResult::Ok => "OK",
            RequestResult::OkButNotNewer => "OK_BUT_NOT_NEWER",
            RequestResult::ObjectNotFound => "OBJECT_NOT_FOUND",
            RequestResult::AccessDenied => "ACCESS_DENIED",
            RequestResult::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl Display for RequestResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
