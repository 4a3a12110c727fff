//! Fixed route table. Paths are matched exactly.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    GadgetUpdate,
    GadgetGet,
    GadgetList,
    ClientGet,
    ClientList,
    ClientHeartbeat,
    ClientSync,
    ClientRemove,
    ClientAck,
}

impl Route {
    pub const ALL: [Self; 9] = [
        Self::GadgetUpdate,
        Self::GadgetGet,
        Self::GadgetList,
        Self::ClientGet,
        Self::ClientList,
        Self::ClientHeartbeat,
        Self::ClientSync,
        Self::ClientRemove,
        Self::ClientAck,
    ];

    #[must_use]
    pub fn as_path(self) -> &'static str {
        match self {
            Self::GadgetUpdate => "gadget/update",
            Self::GadgetGet => "gadget/get",
            Self::GadgetList => "gadget/list",
            Self::ClientGet => "client/get",
            Self::ClientList => "client/list",
            Self::ClientHeartbeat => "client/heartbeat",
            Self::ClientSync => "client/sync",
            Self::ClientRemove => "client/remove",
            Self::ClientAck => "client/ack",
        }
    }

    /// Route for an exact path; `None` for anything else.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|route| route.as_path() == path)
    }

    /// Whether the route answers with data rather than the envelope.
    #[must_use]
    pub fn is_query(self) -> bool {
        matches!(
            self,
            Self::GadgetGet | Self::GadgetList | Self::ClientGet | Self::ClientList
        )
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path())
    }
}
