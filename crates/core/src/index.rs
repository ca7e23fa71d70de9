//! Flattened ancestor closures for one zone.

use crate::error::{Error, Result};
use crate::network::{ClosureScope, Comid, ZoneId};
use serde::{Deserialize, Serialize};

/// All closures of a zone packed into three aligned arrays.
///
/// `ids[i]` owns the slice of `flat_upstream` that starts at the sum of
/// `lengths[..i]` and spans `lengths[i]` entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosureIndex {
    pub zone: ZoneId,
    pub scope: ClosureScope,
    pub ids: Vec<Comid>,
    pub lengths: Vec<u32>,
    pub flat_upstream: Vec<Comid>,
}

impl ClosureIndex {
    /// Packs per-id closures, keeping the order of `closures`.
    pub fn from_closures<I>(zone: impl Into<ZoneId>, scope: ClosureScope, closures: I) -> Self
    where
        I: IntoIterator<Item = (Comid, Vec<Comid>)>,
    {
        let mut ids = Vec::new();
        let mut lengths = Vec::new();
        let mut flat_upstream = Vec::new();
        for (id, members) in closures {
            ids.push(id);
            lengths.push(members.len() as u32);
            flat_upstream.extend(members);
        }
        Self {
            zone: zone.into(),
            scope,
            ids,
            lengths,
            flat_upstream,
        }
    }

    /// Number of indexed ids.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Iterate over `(id, closure)` pairs.
    pub fn iter(&self) -> ClosureIter<'_> {
        ClosureIter {
            index: self,
            pos: 0,
            offset: 0,
        }
    }

    /// Closure of a single id (linear lookup).
    pub fn closure_of(&self, id: Comid) -> Option<&[Comid]> {
        self.iter().find(|(cid, _)| *cid == id).map(|(_, up)| up)
    }

    /// Checks that the three arrays agree with each other.
    pub fn validate(&self) -> Result<()> {
        if self.ids.len() != self.lengths.len() {
            return Err(Error::InvalidIndex {
                zone: self.zone.clone(),
                reason: format!("{} ids but {} lengths", self.ids.len(), self.lengths.len()),
            });
        }
        let total: usize = self.lengths.iter().map(|&l| l as usize).sum();
        if total != self.flat_upstream.len() {
            return Err(Error::InvalidIndex {
                zone: self.zone.clone(),
                reason: format!(
                    "lengths sum to {} but {} upstream entries stored",
                    total,
                    self.flat_upstream.len()
                ),
            });
        }
        Ok(())
    }
}

/// Iterator over the segments of a [`ClosureIndex`].
pub struct ClosureIter<'a> {
    index: &'a ClosureIndex,
    pos: usize,
    offset: usize,
}

impl<'a> Iterator for ClosureIter<'a> {
    type Item = (Comid, &'a [Comid]);

    fn next(&mut self) -> Option<Self::Item> {
        let id = *self.index.ids.get(self.pos)?;
        let len = self.index.lengths[self.pos] as usize;
        let segment = &self.index.flat_upstream[self.offset..self.offset + len];
        self.pos += 1;
        self.offset += len;
        Some((id, segment))
    }
}
