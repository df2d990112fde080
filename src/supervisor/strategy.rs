//! Restart strategy selection: which siblings restart alongside a failing
//! child.

use crate::util::ActorIdentity;

/// `OneForOne`: restart only the failing child.
/// `AllForOne`: restart every child.
/// `RestForOne`: restart the failing child and every sibling spawned after
/// it (by insertion order).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartStrategy {
    OneForOne,
    AllForOne,
    RestForOne,
}

impl RestartStrategy {
    /// `children` is insertion order. Returns the identities that must be
    /// restarted given `failing` failed.
    pub fn children_to_restart(
        &self,
        children: &[ActorIdentity],
        failing: &ActorIdentity,
    ) -> Vec<ActorIdentity> {
        match self {
            RestartStrategy::OneForOne => vec![failing.clone()],
            RestartStrategy::AllForOne => children.to_vec(),
            RestartStrategy::RestForOne => {
                let Some(pos) = children.iter().position(|c| c == failing) else {
                    return vec![failing.clone()];
                };
                children[pos..].to_vec()
            }
        }
    }
}
