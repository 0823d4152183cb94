// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Hierarchical item namespace and per-client browse navigation.
//!
//! Fully qualified item names are split on the branch delimiter into a tree
//! of segments. A [`BrowseNavigator`] keeps one client's current position in
//! that tree and answers position changes, listings and id resolution.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   change_position   ┌──────────────────────┐
//! │  BrowseSessions  │ ──────────────────▶ │   BrowseNavigator    │
//! │ (ClientId → nav) │                     │ (position: segments) │
//! └──────────────────┘                     └──────────────────────┘
//!                                                    │ list_ids
//!                                                    ▼
//!                      ┌───────────┐          ┌──────────────┐
//!                      │ Namespace │ ───────▶ │  BrowseIter  │
//!                      │  (tree)   │ snapshot │ (lazy filter)│
//!                      └───────────┘          └──────────────┘
//! ```
//!
//! # Examples
//!
//! ```
//! use opcsim_core::browse::{BrowseFilter, BrowseNavigator, LeafInfo, Namespace};
//! use opcsim_core::types::{
//!     AccessRights, BrowseDirection, BrowseType, CanonicalType, ItemHandle, TypeKind,
//! };
//!
//! let mut ns = Namespace::new('.');
//! let leaf = LeafInfo::new(
//!     ItemHandle::new(1),
//!     CanonicalType::scalar(TypeKind::Int32),
//!     AccessRights::Readable,
//! );
//! ns.insert("SimulatedData.Ramp", leaf).unwrap();
//!
//! let mut nav = BrowseNavigator::new('.');
//! nav.change_position(&ns, BrowseDirection::Down, Some("SimulatedData")).unwrap();
//! let names: Vec<String> = nav.list_ids(&ns, &BrowseFilter::new(BrowseType::Leaf)).collect();
//! assert_eq!(names, vec!["Ramp".to_string()]);
//! assert_eq!(nav.resolve_full_id("Ramp").unwrap(), "SimulatedData.Ramp");
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{OpcError, OpcResult};
use crate::types::{AccessRights, BrowseDirection, BrowseType, CanonicalType, ClientId, ItemHandle};

// =============================================================================
// Namespace
// =============================================================================

/// Browse metadata stored for every leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafInfo {
    /// Handle of the item.
    pub handle: ItemHandle,
    /// Canonical type of the item.
    pub canonical_type: CanonicalType,
    /// Access rights of the item.
    pub access_rights: AccessRights,
}

impl LeafInfo {
    /// Creates leaf metadata.
    pub fn new(
        handle: ItemHandle,
        canonical_type: CanonicalType,
        access_rights: AccessRights,
    ) -> Self {
        Self {
            handle,
            canonical_type,
            access_rights,
        }
    }
}

#[derive(Debug, Default)]
struct Node {
    children: BTreeMap<String, Node>,
    leaf: Option<LeafInfo>,
}

impl Node {
    fn is_branch(&self) -> bool {
        !self.children.is_empty()
    }

    fn collect_leaves(&self, out: &mut Vec<Candidate>) {
        for (name, child) in &self.children {
            if let Some(leaf) = child.leaf {
                out.push(Candidate::leaf(name.clone(), leaf));
            }
            child.collect_leaves(out);
        }
    }
}

/// Tree of fully qualified item names.
///
/// A node may be a branch (it has children), a leaf (it names an item), or
/// both.
#[derive(Debug)]
pub struct Namespace {
    delimiter: char,
    root: Node,
    leaf_count: usize,
}

impl Namespace {
    /// Creates an empty namespace.
    pub fn new(delimiter: char) -> Self {
        Self {
            delimiter,
            root: Node::default(),
            leaf_count: 0,
        }
    }

    /// Returns the branch delimiter.
    #[inline]
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Returns the number of leaves.
    #[inline]
    pub fn len(&self) -> usize {
        self.leaf_count
    }

    /// Returns `true` if there are no leaves.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.leaf_count == 0
    }

    /// Splits a fully qualified name into segments.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for empty names and names with empty
    /// segments.
    pub fn split<'a>(&self, name: &'a str) -> OpcResult<Vec<&'a str>> {
        split_name(name, self.delimiter)
    }

    /// Registers a leaf under `name`.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if a leaf with that name already exists.
    pub fn insert(&mut self, name: &str, leaf: LeafInfo) -> OpcResult<()> {
        let segments = self.split(name)?;
        let mut node = &mut self.root;
        for segment in segments {
            node = node.children.entry(segment.to_string()).or_default();
        }
        if node.leaf.is_some() {
            return Err(OpcError::conflict("item", name));
        }
        node.leaf = Some(leaf);
        self.leaf_count += 1;
        Ok(())
    }

    /// Removes the leaf under `name` and prunes empty branches.
    pub fn remove(&mut self, name: &str) -> Option<LeafInfo> {
        let segments = self.split(name).ok()?;
        let removed = remove_path(&mut self.root, &segments);
        if removed.is_some() {
            self.leaf_count -= 1;
        }
        removed
    }

    /// Looks up the leaf registered under `name`.
    pub fn leaf(&self, name: &str) -> Option<LeafInfo> {
        let segments = self.split(name).ok()?;
        self.node(&segments)?.leaf
    }

    /// Returns `true` if `path` names the root or an existing branch.
    pub fn is_branch<S: AsRef<str>>(&self, path: &[S]) -> bool {
        if path.is_empty() {
            return true;
        }
        self.node(path).map(Node::is_branch).unwrap_or(false)
    }

    fn node<S: AsRef<str>>(&self, path: &[S]) -> Option<&Node> {
        let mut node = &self.root;
        for segment in path {
            node = node.children.get(segment.as_ref())?;
        }
        Some(node)
    }

    fn candidates<S: AsRef<str>>(&self, path: &[S], browse_type: BrowseType) -> Vec<Candidate> {
        let Some(node) = self.node(path) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        match browse_type {
            BrowseType::Branch => {
                for (name, child) in &node.children {
                    if child.is_branch() {
                        out.push(Candidate::branch(name.clone()));
                    }
                }
            }
            BrowseType::Leaf => {
                for (name, child) in &node.children {
                    if let Some(leaf) = child.leaf {
                        out.push(Candidate::leaf(name.clone(), leaf));
                    }
                }
            }
            BrowseType::Flat => node.collect_leaves(&mut out),
        }
        out
    }
}

fn remove_path<S: AsRef<str>>(node: &mut Node, path: &[S]) -> Option<LeafInfo> {
    let (first, rest) = path.split_first()?;
    let child = node.children.get_mut(first.as_ref())?;
    let removed = if rest.is_empty() {
        child.leaf.take()
    } else {
        remove_path(child, rest)
    };
    if child.leaf.is_none() && child.children.is_empty() {
        node.children.remove(first.as_ref());
    }
    removed
}

/// Splits a fully qualified name on `delimiter`, rejecting empty segments.
pub fn split_name(name: &str, delimiter: char) -> OpcResult<Vec<&str>> {
    if name.is_empty() {
        return Err(OpcError::invalid_argument("name", "name must not be empty"));
    }
    let segments: Vec<&str> = name.split(delimiter).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(OpcError::invalid_argument(
            "name",
            format!("'{}' contains an empty segment", name),
        ));
    }
    Ok(segments)
}

// =============================================================================
// Browse Filter
// =============================================================================

/// Options of a browse listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseFilter {
    /// What to list.
    pub browse_type: BrowseType,
    /// Wildcard pattern (`*`, `?`, `#`) applied to names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_filter: Option<String>,
    /// Canonical type leaves must have.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_filter: Option<CanonicalType>,
    /// Access rights leaves must grant.
    #[serde(default)]
    pub access_filter: AccessRights,
}

impl BrowseFilter {
    /// Creates a filter that lists everything of `browse_type`.
    pub fn new(browse_type: BrowseType) -> Self {
        Self {
            browse_type,
            name_filter: None,
            type_filter: None,
            access_filter: AccessRights::NotKnown,
        }
    }

    /// Sets the name pattern.
    pub fn with_name_filter(mut self, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        self.name_filter = (!pattern.is_empty()).then_some(pattern);
        self
    }

    /// Sets the canonical type filter.
    pub fn with_type_filter(mut self, ty: CanonicalType) -> Self {
        self.type_filter = Some(ty);
        self
    }

    /// Sets the access rights filter.
    pub fn with_access_filter(mut self, access: AccessRights) -> Self {
        self.access_filter = access;
        self
    }

    fn accepts(&self, candidate: &Candidate) -> bool {
        if let Some(pattern) = &self.name_filter {
            if !matches_pattern(pattern, &candidate.name) {
                return false;
            }
        }
        match &candidate.leaf {
            None => true,
            Some(leaf) => {
                self.type_filter
                    .map(|ty| ty == leaf.canonical_type)
                    .unwrap_or(true)
                    && leaf.access_rights.satisfies(self.access_filter)
            }
        }
    }
}

/// Matches `text` against a wildcard pattern.
///
/// `*` matches any run of characters, `?` exactly one character and `#` one
/// ASCII digit.
pub fn matches_pattern(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        match p.get(pi) {
            Some('*') => {
                star = Some((pi, ti));
                pi += 1;
            }
            Some('?') => {
                pi += 1;
                ti += 1;
            }
            Some('#') if t[ti].is_ascii_digit() => {
                pi += 1;
                ti += 1;
            }
            Some(c) if *c != '#' && *c == t[ti] => {
                pi += 1;
                ti += 1;
            }
            _ => match star {
                Some((sp, st)) => {
                    pi = sp + 1;
                    ti = st + 1;
                    star = Some((sp, st + 1));
                }
                None => return false,
            },
        }
    }
    p[pi..].iter().all(|c| *c == '*')
}

// =============================================================================
// Browse Iterator
// =============================================================================

#[derive(Debug, Clone)]
struct Candidate {
    name: String,
    leaf: Option<LeafInfo>,
}

impl Candidate {
    fn branch(name: String) -> Self {
        Self { name, leaf: None }
    }

    fn leaf(name: String, leaf: LeafInfo) -> Self {
        Self {
            name,
            leaf: Some(leaf),
        }
    }
}

/// Lazy, finite and restartable sequence of single-segment names.
///
/// The candidate set is captured when the listing is created; filters are
/// applied as the iterator advances.
#[derive(Debug, Clone)]
pub struct BrowseIter {
    candidates: Vec<Candidate>,
    filter: BrowseFilter,
    cursor: usize,
}

impl BrowseIter {
    fn new(candidates: Vec<Candidate>, filter: BrowseFilter) -> Self {
        Self {
            candidates,
            filter,
            cursor: 0,
        }
    }

    /// Rewinds the sequence to its first element.
    pub fn restart(&mut self) {
        self.cursor = 0;
    }
}

impl Iterator for BrowseIter {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(candidate) = self.candidates.get(self.cursor) {
            self.cursor += 1;
            if self.filter.accepts(candidate) {
                return Some(candidate.name.clone());
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.candidates.len() - self.cursor))
    }
}

// =============================================================================
// Browse Navigator
// =============================================================================

/// One client's position in a [`Namespace`].
#[derive(Debug, Clone)]
pub struct BrowseNavigator {
    delimiter: char,
    position: Vec<String>,
}

impl BrowseNavigator {
    /// Creates a navigator positioned at the root.
    pub fn new(delimiter: char) -> Self {
        Self {
            delimiter,
            position: Vec::new(),
        }
    }

    /// Returns `true` if the navigator is at the root.
    #[inline]
    pub fn is_at_root(&self) -> bool {
        self.position.is_empty()
    }

    /// Returns the fully qualified current position (empty at the root).
    pub fn position(&self) -> String {
        self.join(&self.position)
    }

    fn join(&self, segments: &[String]) -> String {
        let mut out = String::new();
        for (i, segment) in segments.iter().enumerate() {
            if i > 0 {
                out.push(self.delimiter);
            }
            out.push_str(segment);
        }
        out
    }

    /// Moves the position and returns the new fully qualified position.
    ///
    /// # Errors
    ///
    /// - `Fail` when moving up from the root
    /// - `InvalidArgument` when `Down` has no single-segment target, or the
    ///   target of `Down`/`To` is not a known branch
    pub fn change_position(
        &mut self,
        namespace: &Namespace,
        direction: BrowseDirection,
        target: Option<&str>,
    ) -> OpcResult<String> {
        match direction {
            BrowseDirection::Up => {
                if self.position.pop().is_none() {
                    return Err(OpcError::fail("already at the root"));
                }
            }
            BrowseDirection::Down => {
                let segment = target.filter(|t| !t.is_empty()).ok_or_else(|| {
                    OpcError::invalid_argument("target", "moving down requires a branch name")
                })?;
                if segment.contains(self.delimiter) {
                    return Err(OpcError::invalid_argument(
                        "target",
                        format!("'{}' is not a single segment", segment),
                    ));
                }
                let mut next = self.position.clone();
                next.push(segment.to_string());
                if !namespace.is_branch(&next) {
                    return Err(OpcError::invalid_argument(
                        "target",
                        format!("'{}' is not a branch", segment),
                    ));
                }
                self.position = next;
            }
            BrowseDirection::To => match target.filter(|t| !t.is_empty()) {
                None => self.position.clear(),
                Some(path) => {
                    let segments = split_name(path, self.delimiter)?;
                    if !namespace.is_branch(&segments) {
                        return Err(OpcError::invalid_argument(
                            "target",
                            format!("'{}' is not a branch", path),
                        ));
                    }
                    self.position = segments.into_iter().map(str::to_string).collect();
                }
            },
        }

        let position = self.position();
        trace!(?direction, position = %position, "Browse position changed");
        Ok(position)
    }

    /// Lists names at the current position.
    ///
    /// An empty result is a valid answer, not an error.
    pub fn list_ids(&self, namespace: &Namespace, filter: &BrowseFilter) -> BrowseIter {
        BrowseIter::new(
            namespace.candidates(&self.position, filter.browse_type),
            filter.clone(),
        )
    }

    /// Resolves a local name against the current position.
    ///
    /// An empty local name resolves to the position itself.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `local` contains the delimiter.
    pub fn resolve_full_id(&self, local: &str) -> OpcResult<String> {
        if local.is_empty() {
            return Ok(self.position());
        }
        if local.contains(self.delimiter) {
            return Err(OpcError::invalid_argument(
                "name",
                format!("'{}' is not a single segment", local),
            ));
        }
        if self.is_at_root() {
            Ok(local.to_string())
        } else {
            Ok(format!("{}{}{}", self.position(), self.delimiter, local))
        }
    }
}

// =============================================================================
// Browse Sessions
// =============================================================================

/// Per-client browse navigators.
///
/// Each client owns an independent position; changing one never affects
/// another client's outstanding browse state.
#[derive(Debug)]
pub struct BrowseSessions {
    delimiter: char,
    sessions: DashMap<ClientId, Arc<Mutex<BrowseNavigator>>>,
}

impl BrowseSessions {
    /// Creates an empty session table.
    pub fn new(delimiter: char) -> Self {
        Self {
            delimiter,
            sessions: DashMap::new(),
        }
    }

    /// Returns the navigator of `client`, creating it at the root if needed.
    pub fn navigator(&self, client: ClientId) -> Arc<Mutex<BrowseNavigator>> {
        self.sessions
            .entry(client)
            .or_insert_with(|| Arc::new(Mutex::new(BrowseNavigator::new(self.delimiter))))
            .clone()
    }

    /// Drops the navigator of `client`.
    pub fn remove(&self, client: &ClientId) -> bool {
        self.sessions.remove(client).is_some()
    }

    /// Returns the number of clients with a browse session.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no client has a browse session.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
