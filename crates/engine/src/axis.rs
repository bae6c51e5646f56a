//! Ordered axis: one dimension (rows or columns) of a grid.
//!
//! An axis keeps three views of the same entities:
//! - an identity map for O(1) lookup by id
//! - an order vector, the single source of truth for ordering
//! - per-entity `Links` (position, prev, next), a cache derived from the order vector
//!
//! Every public operation leaves all three views consistent before returning.
//! Rows use the `*_in` variants with a section range so that title, body and
//! footer rows stay contiguous; columns use the whole axis.

use std::cmp::Ordering;
use std::ops::Range;
use std::str::FromStr;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{GridError, Result};
use crate::identity::{self, AxisKind, EntityId, IdSequence};

/// Derived neighbour and position data for an entity inside its axis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Links {
    pub(crate) position: usize,
    pub(crate) prev: Option<EntityId>,
    pub(crate) next: Option<EntityId>,
}

impl Links {
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn prev(&self) -> Option<&EntityId> {
        self.prev.as_ref()
    }

    pub fn next(&self) -> Option<&EntityId> {
        self.next.as_ref()
    }
}

/// An entity that can live in an `OrderedAxis`.
pub trait AxisEntity {
    fn id(&self) -> &EntityId;
    fn links(&self) -> &Links;
    fn links_mut(&mut self) -> &mut Links;
}

/// Where to insert or move an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    /// Absolute index. Negative values count from the end (`-1` = last slot);
    /// out-of-range values clamp to the nearest boundary.
    Index(isize),
    /// `"first"` / `"top"`
    First,
    /// `"last"` / `"bottom"`
    Last,
    /// Immediately after another entity.
    After(EntityId),
    /// Relative to an anchor entity.
    ///
    /// When the anchor is the entity being moved, the final index is its current
    /// index plus `delta`. Otherwise a positive delta lands `delta` slots after the
    /// anchor and a negative delta lands `|delta| - 1` slots before it, so `up`
    /// is directly above the anchor and `down` directly below.
    Offset { anchor: EntityId, delta: isize },
}

impl Position {
    pub fn after(anchor: impl Into<EntityId>) -> Self {
        Position::After(anchor.into())
    }

    pub fn up(anchor: impl Into<EntityId>) -> Self {
        Position::Offset { anchor: anchor.into(), delta: -1 }
    }

    pub fn down(anchor: impl Into<EntityId>) -> Self {
        Position::Offset { anchor: anchor.into(), delta: 1 }
    }

    /// Parse `"up"`, `"down"`, `"+n"` or `"-n"` relative to `anchor`.
    pub fn relative(text: &str, anchor: impl Into<EntityId>) -> Result<Self> {
        let text = text.trim();
        let delta = match text.to_ascii_lowercase().as_str() {
            "up" => -1,
            "down" => 1,
            _ if text.starts_with('+') || text.starts_with('-') => text
                .parse::<isize>()
                .map_err(|_| GridError::InvalidPosition(format!("cannot parse offset '{text}'")))?,
            _ => {
                return Err(GridError::InvalidPosition(format!(
                    "'{text}' is not a relative position"
                )))
            }
        };
        Ok(Position::Offset { anchor: anchor.into(), delta })
    }
}

impl FromStr for Position {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "top" => Ok(Position::First),
            "last" | "bottom" => Ok(Position::Last),
            other => other
                .parse::<isize>()
                .map(Position::Index)
                .map_err(|_| GridError::InvalidPosition(format!("cannot parse position '{s}'"))),
        }
    }
}

impl From<isize> for Position {
    fn from(i: isize) -> Self {
        Position::Index(i)
    }
}

impl From<i32> for Position {
    fn from(i: i32) -> Self {
        Position::Index(i as isize)
    }
}

impl From<usize> for Position {
    fn from(i: usize) -> Self {
        Position::Index(i.min(isize::MAX as usize) as isize)
    }
}

/// One ordered, identity-indexed dimension of a grid.
#[derive(Debug, Clone)]
pub struct OrderedAxis<E> {
    kind: AxisKind,
    entities: FxHashMap<EntityId, E>,
    order: Vec<EntityId>,
    /// Ids removed from this axis; never handed out again by `generate_id`.
    retired: FxHashSet<EntityId>,
}

impl<E: AxisEntity> OrderedAxis<E> {
    pub fn new(kind: AxisKind) -> Self {
        Self {
            kind,
            entities: FxHashMap::default(),
            order: Vec::new(),
            retired: FxHashSet::default(),
        }
    }

    pub fn kind(&self) -> AxisKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&E> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut E> {
        self.entities.get_mut(id)
    }

    pub fn at(&self, position: usize) -> Option<&E> {
        self.order.get(position).and_then(|id| self.entities.get(id))
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.entities.get(id).map(|e| e.links().position)
    }

    /// Ids in axis order.
    pub fn ids(&self) -> &[EntityId] {
        &self.order
    }

    /// Entities in axis order.
    pub fn iter(&self) -> impl Iterator<Item = &E> + '_ {
        self.order.iter().filter_map(|id| self.entities.get(id))
    }

    /// Entities in `range`, in axis order.
    pub fn iter_range(&self, range: Range<usize>) -> impl Iterator<Item = &E> + '_ {
        let range = self.clamp(range);
        self.order[range].iter().filter_map(|id| self.entities.get(id))
    }

    /// All entities, in no particular order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut E> + '_ {
        self.entities.values_mut()
    }

    pub fn is_retired(&self, id: &str) -> bool {
        self.retired.contains(id)
    }

    /// Accept `proposed` unless it is already live in this axis.
    pub fn validate_id(&self, proposed: impl Into<EntityId>) -> Result<EntityId> {
        let id = proposed.into();
        if self.entities.contains_key(id.as_str()) {
            return Err(GridError::DuplicateId { axis: self.kind, id });
        }
        Ok(id)
    }

    /// A fresh id that is neither live nor retired in this axis.
    pub fn generate_id(&self, sequence: &IdSequence, prefix: &str) -> EntityId {
        identity::generate_id(sequence, self.kind, prefix, |candidate| {
            self.entities.contains_key(candidate) || self.retired.contains(candidate)
        })
    }

    fn clamp(&self, range: Range<usize>) -> Range<usize> {
        let end = range.end.min(self.order.len());
        range.start.min(end)..end
    }

    /// Resolve `position` to an absolute index inside `section`.
    ///
    /// With `moving` set, the result is expressed in the order that remains after
    /// lifting that entity out. Pure: the axis is never modified.
    pub fn resolve(
        &self,
        position: &Position,
        section: Range<usize>,
        moving: Option<&EntityId>,
    ) -> Result<usize> {
        let section = self.clamp(section);

        let current = match moving {
            Some(id) => {
                let idx = self.index_of(id.as_str()).ok_or_else(|| {
                    GridError::InvalidPosition(format!("unknown {} '{}'", self.kind, id))
                })?;
                if !section.contains(&idx) {
                    return Err(GridError::InvalidPosition(format!(
                        "{} '{}' is outside the target section",
                        self.kind, id
                    )));
                }
                Some(idx)
            }
            None => None,
        };
        let len = section.len() - usize::from(current.is_some());
        let own_local = current.map(|c| c - section.start);

        let anchor_local = |anchor: &EntityId| -> Result<usize> {
            let idx = self.index_of(anchor.as_str()).ok_or_else(|| {
                GridError::InvalidPosition(format!("unknown {} '{}'", self.kind, anchor))
            })?;
            if !section.contains(&idx) {
                return Err(GridError::InvalidPosition(format!(
                    "{} '{}' is outside the target section",
                    self.kind, anchor
                )));
            }
            let idx = match current {
                Some(c) if idx > c => idx - 1,
                _ => idx,
            };
            Ok(idx - section.start)
        };

        let local: isize = match position {
            Position::Index(n) if *n >= 0 => *n,
            Position::Index(n) => (len as isize + 1).saturating_add(*n),
            Position::First => 0,
            Position::Last => len as isize,
            Position::After(anchor) => match own_local {
                Some(own) if moving == Some(anchor) => own as isize,
                _ => anchor_local(anchor)? as isize + 1,
            },
            Position::Offset { anchor, delta } => match own_local {
                Some(own) if moving == Some(anchor) => (own as isize).saturating_add(*delta),
                _ => {
                    let a = anchor_local(anchor)? as isize;
                    match (*delta).cmp(&0) {
                        Ordering::Greater => a.saturating_add(*delta),
                        Ordering::Less => (a + 1).saturating_add(*delta),
                        Ordering::Equal => a,
                    }
                }
            },
        };

        Ok(section.start + local.clamp(0, len as isize) as usize)
    }

    /// Insert `entity` at `position` anywhere in the axis.
    pub fn insert(&mut self, entity: E, position: &Position) -> Result<usize> {
        let whole = 0..self.len();
        self.insert_in(entity, position, whole)
    }

    /// Insert `entity` at `position` resolved inside `section`.
    pub fn insert_in(&mut self, entity: E, position: &Position, section: Range<usize>) -> Result<usize> {
        self.validate_id(entity.id())?;
        let index = self.resolve(position, section, None)?;
        self.insert_at(entity, index);
        Ok(index)
    }

    /// Insert at an already-resolved index. Callers validate the id first.
    pub(crate) fn insert_at(&mut self, entity: E, index: usize) {
        let index = index.min(self.order.len());
        let id = entity.id().clone();
        self.order.insert(index, id.clone());
        self.entities.insert(id, entity);
        self.relink(index.saturating_sub(1));
    }

    /// Remove an entity. Returns `None` when the id is not present.
    pub fn remove(&mut self, id: &str) -> Option<E> {
        let index = self.index_of(id)?;
        self.order.remove(index);
        let mut entity = self.entities.remove(id)?;
        *entity.links_mut() = Links::default();
        self.retired.insert(entity.id().clone());
        self.relink(index.saturating_sub(1));
        Some(entity)
    }

    /// Move an entity anywhere in the axis. Returns its new index, or `None`
    /// when the id is not present.
    pub fn move_to(&mut self, id: &str, position: &Position) -> Result<Option<usize>> {
        let whole = 0..self.len();
        self.move_in(id, position, whole)
    }

    /// Move an entity to `position` inside `section`, which must contain it.
    pub fn move_in(&mut self, id: &str, position: &Position, section: Range<usize>) -> Result<Option<usize>> {
        let Some(current) = self.index_of(id) else {
            return Ok(None);
        };
        let moving = self.order[current].clone();
        let target = self.resolve(position, section, Some(&moving))?;
        if target != current {
            let id = self.order.remove(current);
            self.order.insert(target, id);
            self.relink(current.min(target).saturating_sub(1));
        }
        Ok(Some(target))
    }

    /// Apply a possibly partial ordering to the whole axis.
    pub fn reorder<S: AsRef<str>>(&mut self, ids: &[S]) -> Vec<(EntityId, usize)> {
        let whole = 0..self.len();
        self.reorder_in(ids, whole)
    }

    /// Apply a possibly partial ordering inside `section`.
    ///
    /// Mentioned ids come first in the given order; the rest follow in their
    /// previous relative order. Unknown ids, ids outside the section, and
    /// repeats are ignored. Returns the entities whose index changed.
    pub fn reorder_in<S: AsRef<str>>(&mut self, ids: &[S], section: Range<usize>) -> Vec<(EntityId, usize)> {
        let section = self.clamp(section);
        let mut seen: FxHashSet<usize> = FxHashSet::default();
        let mut new_order: Vec<EntityId> = Vec::with_capacity(section.len());

        for id in ids {
            if let Some(idx) = self.index_of(id.as_ref()) {
                if section.contains(&idx) && seen.insert(idx) {
                    new_order.push(self.order[idx].clone());
                }
            }
        }
        for idx in section.clone() {
            if !seen.contains(&idx) {
                new_order.push(self.order[idx].clone());
            }
        }

        self.apply_section_order(section, new_order)
    }

    /// Stable sort of the whole axis with a less-than predicate.
    pub fn sort_by<F>(&mut self, less: F) -> Vec<(EntityId, usize)>
    where
        F: FnMut(&E, &E) -> bool,
    {
        let whole = 0..self.len();
        self.sort_in(whole, less)
    }

    /// Stable sort of `section`. Entities for which neither `less(a, b)` nor
    /// `less(b, a)` holds keep their relative order.
    pub fn sort_in<F>(&mut self, section: Range<usize>, mut less: F) -> Vec<(EntityId, usize)>
    where
        F: FnMut(&E, &E) -> bool,
    {
        let section = self.clamp(section);
        let mut ids = self.order[section.clone()].to_vec();
        let entities = &self.entities;
        ids.sort_by(|a, b| {
            let (ea, eb) = (&entities[a], &entities[b]);
            if less(ea, eb) {
                Ordering::Less
            } else if less(eb, ea) {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        });
        self.apply_section_order(section, ids)
    }

    fn apply_section_order(&mut self, section: Range<usize>, new_order: Vec<EntityId>) -> Vec<(EntityId, usize)> {
        debug_assert_eq!(section.len(), new_order.len());
        let changed: Vec<(EntityId, usize)> = new_order
            .iter()
            .zip(&self.order[section.clone()])
            .enumerate()
            .filter(|(_, (new, old))| new != old)
            .map(|(i, (new, _))| (new.clone(), section.start + i))
            .collect();

        if !changed.is_empty() {
            let start = section.start;
            self.order.splice(section, new_order);
            self.relink(start.saturating_sub(1));
        }
        changed
    }

    /// Remove every entity, returning them in axis order.
    pub(crate) fn drain(&mut self) -> Vec<E> {
        let order = std::mem::take(&mut self.order);
        let mut drained = Vec::with_capacity(order.len());
        for id in order {
            if let Some(mut e) = self.entities.remove(id.as_str()) {
                *e.links_mut() = Links::default();
                self.retired.insert(id);
                drained.push(e);
            }
        }
        drained
    }

    /// Re-derive links for every entity from `from` to the end.
    fn relink(&mut self, from: usize) {
        for i in from..self.order.len() {
            let prev = if i > 0 { Some(self.order[i - 1].clone()) } else { None };
            let next = self.order.get(i + 1).cloned();
            if let Some(entity) = self.entities.get_mut(self.order[i].as_str()) {
                let links = entity.links_mut();
                links.position = i;
                links.prev = prev;
                links.next = next;
            }
        }
    }

    /// Verify that the identity map, order vector and links agree.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        if self.entities.len() != self.order.len() {
            return Err(format!(
                "{} axis: map has {} entries, order has {}",
                self.kind,
                self.entities.len(),
                self.order.len()
            ));
        }
        for (i, id) in self.order.iter().enumerate() {
            let entity = self
                .entities
                .get(id)
                .ok_or_else(|| format!("{} axis: '{}' in order but not in map", self.kind, id))?;
            if entity.id() != id {
                return Err(format!("{} axis: map key '{}' holds '{}'", self.kind, id, entity.id()));
            }
            let links = entity.links();
            if links.position != i {
                return Err(format!(
                    "{} axis: '{}' at index {} reports position {}",
                    self.kind, id, i, links.position
                ));
            }
            let prev = if i > 0 { Some(&self.order[i - 1]) } else { None };
            if links.prev.as_ref() != prev {
                return Err(format!("{} axis: '{}' has wrong prev {:?}", self.kind, id, links.prev));
            }
            if links.next.as_ref() != self.order.get(i + 1) {
                return Err(format!("{} axis: '{}' has wrong next {:?}", self.kind, id, links.next));
            }
        }
        Ok(())
    }
}
