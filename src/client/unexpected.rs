use crate::types::{Rank, Tag};

/// Point-to-point messages that arrived before a matching `recv`.
///
/// Each entry keeps its connection open with the payload still unread, so
/// the queue holds sockets rather than copies. Entries stay in arrival
/// order and `take` removes the oldest match.
#[derive(Debug)]
pub(crate) struct UnexpectedQueue<C> {
    entries: Vec<Unexpected<C>>,
}

#[derive(Debug)]
struct Unexpected<C> {
    peer: Rank,
    tag: Tag,
    conn: C,
}

impl<C> Default for UnexpectedQueue<C> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<C> UnexpectedQueue<C> {
    pub(crate) fn push(&mut self, peer: Rank, tag: Tag, conn: C) {
        self.entries.push(Unexpected { peer, tag, conn });
    }

    /// Remove and return the oldest entry from `peer` with `tag`.
    pub(crate) fn take(&mut self, peer: Rank, tag: Tag) -> Option<C> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.peer == peer && e.tag == tag)?;
        Some(self.entries.remove(pos).conn)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
