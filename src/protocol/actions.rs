//! Action dispatch table
//!
//! Decoding is two-phase: the header is parsed first to validate the kind
//! and id and to find the action name, then the whole frame is decoded again
//! into the shape registered for that action, or into [`GenericRequest`]
//! when nothing is registered.

use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;

use super::request::{GenericRequest, Request, RequestHeader, RequestKind};
use crate::error::{HubError, HubResult, ProtocolError};

type DecodeFn = fn(&str) -> Result<Box<dyn Request>, serde_json::Error>;

fn decode_as<T>(text: &str) -> Result<Box<dyn Request>, serde_json::Error>
where
    T: Request + DeserializeOwned,
{
    let request: T = serde_json::from_str(text)?;
    Ok(Box::new(request))
}

/// Immutable mapping from action name to decoder. Shared read-only by every
/// connection reader.
#[derive(Default)]
pub struct ActionTable {
    decoders: HashMap<String, DecodeFn>,
}

impl ActionTable {
    pub fn builder() -> ActionTableBuilder {
        ActionTableBuilder::default()
    }

    /// Table with no registered actions; every request decodes generically
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, action: &str) -> bool {
        self.decoders.contains_key(action)
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Registered action names, sorted
    pub fn actions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Decode one text frame into a typed request
    pub fn decode(&self, text: &str) -> Result<Box<dyn Request>, ProtocolError> {
        let header: RequestHeader = serde_json::from_str(text).map_err(ProtocolError::Malformed)?;

        if header.kind() != Some(RequestKind::Action) {
            return Err(ProtocolError::NotAnAction(header.kind));
        }
        if header.id.is_empty() {
            return Err(ProtocolError::MissingId);
        }

        let decode = self
            .decoders
            .get(&header.action)
            .copied()
            .unwrap_or(decode_as::<GenericRequest>);

        decode(text).map_err(|source| ProtocolError::Decode {
            action: header.action,
            source,
        })
    }
}

impl fmt::Debug for ActionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionTable")
            .field("actions", &self.actions())
            .finish()
    }
}

/// Collects registrations; problems are reported together by
/// [`ActionTableBuilder::build`].
#[derive(Default)]
pub struct ActionTableBuilder {
    decoders: HashMap<String, DecodeFn>,
    problems: Vec<String>,
}

impl ActionTableBuilder {
    /// Decode frames whose `action` equals `action` into `T`
    pub fn register<T>(mut self, action: impl Into<String>) -> Self
    where
        T: Request + DeserializeOwned,
    {
        let action = action.into();
        if action.is_empty() {
            self.problems
                .push(format!("empty action name for {}", std::any::type_name::<T>()));
        } else if self.decoders.contains_key(&action) {
            self.problems
                .push(format!("action {:?} registered more than once", action));
        } else {
            self.decoders.insert(action, decode_as::<T>);
        }
        self
    }

    pub fn build(self) -> HubResult<ActionTable> {
        if !self.problems.is_empty() {
            return Err(HubError::InvalidActionTable(self.problems.join("; ")));
        }
        Ok(ActionTable {
            decoders: self.decoders,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Move {
        #[serde(flatten)]
        header: RequestHeader,
        x: i32,
        y: i32,
    }

    impl Request for Move {
        fn header(&self) -> &RequestHeader {
            &self.header
        }
    }

    fn table() -> ActionTable {
        ActionTable::builder().register::<Move>("move").build().unwrap()
    }

    #[test]
    fn test_registered_action_decodes_concrete_shape() {
        let request = table()
            .decode(r#"{"id":"a","type":"ACTION","action":"move","x":3,"y":-1}"#)
            .unwrap();

        let mv = request.downcast_ref::<Move>().expect("concrete shape");
        assert_eq!((mv.x, mv.y), (3, -1));
        assert_eq!(request.id(), "a");
    }

    #[test]
    fn test_unregistered_action_falls_back_to_generic() {
        let request = table()
            .decode(r#"{"id":"b","type":"ACTION","action":"jump","payload":[1]}"#)
            .unwrap();

        let generic = request.downcast_ref::<GenericRequest>().unwrap();
        assert_eq!(generic.header.action, "jump");
        assert_eq!(generic.payload, serde_json::json!([1]));
    }

    #[test]
    fn test_header_violations() {
        let table = table();

        assert!(matches!(
            table.decode("not json"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            table.decode(r#"{"id":"c","type":"NOTICE","action":"move"}"#),
            Err(ProtocolError::NotAnAction(kind)) if kind == "NOTICE"
        ));
        assert!(matches!(
            table.decode(r#"{"id":"c","type":"NOTIFICATION","action":"move"}"#),
            Err(ProtocolError::NotAnAction(_))
        ));
        assert!(matches!(
            table.decode(r#"{"type":"ACTION","action":"move","x":1,"y":1}"#),
            Err(ProtocolError::MissingId)
        ));
    }

    #[test]
    fn test_shape_mismatch_is_decode_error() {
        let err = table()
            .decode(r#"{"id":"d","type":"ACTION","action":"move","x":"left"}"#)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Decode { ref action, .. } if action == "move"));
    }

    #[test]
    fn test_builder_rejects_bad_entries() {
        let err = ActionTable::builder()
            .register::<Move>("move")
            .register::<GenericRequest>("move")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("more than once"));

        assert!(ActionTable::builder()
            .register::<Move>("")
            .build()
            .is_err());
    }

    #[test]
    fn test_listing() {
        let table = ActionTable::builder()
            .register::<Move>("move")
            .register::<GenericRequest>("attack")
            .build()
            .unwrap();
        assert_eq!(table.actions(), vec!["attack", "move"]);
        assert!(table.contains("move"));
        assert!(!table.contains("jump"));
        assert!(ActionTable::empty().is_empty());
    }
}
