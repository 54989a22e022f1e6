use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::fmt;

/// Kind of an inbound request. Only [`RequestKind::Action`] is accepted by
/// the connection reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Action,
    Notification,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Action => "ACTION",
            RequestKind::Notification => "NOTIFICATION",
        }
    }

    /// Map a wire `type` value to a known kind
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ACTION" => Some(RequestKind::Action),
            "NOTIFICATION" => Some(RequestKind::Notification),
            _ => None,
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields every inbound frame carries.
///
/// Missing fields decode as empty strings so that the reader can report
/// *which* part of the header is wrong instead of a generic JSON error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestHeader {
    #[serde(default)]
    pub id: String,

    /// Raw `type` value; see [`RequestHeader::kind`]
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub action: String,
}

impl RequestHeader {
    /// Header of an `ACTION` request
    pub fn new(id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: RequestKind::Action.as_str().to_string(),
            action: action.into(),
        }
    }

    pub fn kind(&self) -> Option<RequestKind> {
        RequestKind::parse(&self.kind)
    }
}

/// Upcast helper so `dyn Request` can be downcast to its concrete shape.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A decoded inbound request.
///
/// Concrete request shapes embed a [`RequestHeader`] with
/// `#[serde(flatten)]` and expose it through [`Request::header`]; the
/// identifier, kind and action accessors come for free.
///
/// ```
/// use dx_hub::protocol::{Request, RequestHeader};
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize)]
/// struct Rename {
///     #[serde(flatten)]
///     header: RequestHeader,
///     name: String,
/// }
///
/// impl Request for Rename {
///     fn header(&self) -> &RequestHeader {
///         &self.header
///     }
/// }
/// ```
pub trait Request: AsAny + fmt::Debug + Send + Sync + 'static {
    fn header(&self) -> &RequestHeader;

    fn id(&self) -> &str {
        &self.header().id
    }

    fn kind(&self) -> Option<RequestKind> {
        self.header().kind()
    }

    fn action(&self) -> &str {
        &self.header().action
    }
}

impl dyn Request {
    /// Borrow the request as its concrete shape
    pub fn downcast_ref<T: Request>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn is<T: Request>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

impl Request for RequestHeader {
    fn header(&self) -> &RequestHeader {
        self
    }
}

/// Fallback shape for actions with no registered decoder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericRequest {
    #[serde(flatten)]
    pub header: RequestHeader,

    /// Free-form payload, `null` when absent
    #[serde(default)]
    pub payload: Value,
}

impl GenericRequest {
    pub fn new(id: impl Into<String>, action: impl Into<String>, payload: Value) -> Self {
        Self {
            header: RequestHeader::new(id, action),
            payload,
        }
    }
}

impl Request for GenericRequest {
    fn header(&self) -> &RequestHeader {
        &self.header
    }
}
