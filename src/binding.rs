//! Binding lifecycle: keeps a target property in sync with a path.
//!
//! A [`Binding`] ties one property of a [`BindingHost`] (the *target*) to a
//! [`BindingPath`] evaluated against the host's effective data context (the
//! *source*). It owns a [`Traversal`] whose edges report source changes, and
//! listens to the target host for `DataContext`/`Parent` replacement and, in
//! two-way modes, for edits of the bound property.
//!
//! Self-caused notifications are suppressed with a per-binding [`SyncState`]
//! tag: while the binding writes the target it ignores the target's
//! notifications, and while it writes the source it ignores the edge it is
//! writing through.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use tracing::{debug, trace, warn};

use crate::object::{AccessError, Bindable, HandlerId, PropertyInfo};
use crate::path::{BindingPath, SyntaxError};
use crate::traversal::{EdgeId, Traversal, TraversalError};
use crate::value::Value;

/// Property raised by a host when its data context is replaced.
pub const DATA_CONTEXT: &str = "DataContext";

/// Property raised by a host when it moves to another parent.
pub const PARENT: &str = "Parent";

// ---------------------------------------------------------------------------
// Host contract
// ---------------------------------------------------------------------------

/// An element that can be the target of bindings.
///
/// Hosts raise [`DATA_CONTEXT`] and [`PARENT`] on their property change event
/// when either changes.
pub trait BindingHost: Bindable {
    /// The data context set directly on this host (`Null` if unset).
    fn data_context(&self) -> Value;

    /// The logical parent container.
    fn parent_host(&self) -> Option<Rc<dyn BindingHost>>;
}

/// The data context of `host`, or of its nearest ancestor that has one.
pub fn effective_data_context(host: &dyn BindingHost) -> Value {
    let context = host.data_context();
    if !context.is_null() {
        return context;
    }
    let mut next = host.parent_host();
    while let Some(ancestor) = next {
        let context = ancestor.data_context();
        if !context.is_null() {
            return context;
        }
        next = ancestor.parent_host();
    }
    Value::Null
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from creating or updating a binding.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindingError {
    #[error("invalid binding path: {0}")]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Traversal(#[from] TraversalError),
    #[error("{type_name} has no target property '{property}'")]
    TargetNotFound { type_name: String, property: String },
    #[error(transparent)]
    Access(#[from] AccessError),
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Direction(s) in which a binding propagates values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BindingMode {
    /// Source to target, initially and on every source change.
    #[default]
    OneWay,
    /// Both directions.
    TwoWay,
    /// Target to source on every target change; the target is written once,
    /// initially.
    OneWayToSource,
}

impl BindingMode {
    /// Whether source changes after the initial read are written to the target.
    pub fn updates_target(self) -> bool {
        matches!(self, BindingMode::OneWay | BindingMode::TwoWay)
    }

    /// Whether target edits are written back to the source.
    pub fn updates_source(self) -> bool {
        matches!(self, BindingMode::TwoWay | BindingMode::OneWayToSource)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BindingMode::OneWay => "OneWay",
            BindingMode::TwoWay => "TwoWay",
            BindingMode::OneWayToSource => "OneWayToSource",
        }
    }
}

impl fmt::Display for BindingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`BindingMode`] name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown binding mode '{0}'")]
pub struct UnknownMode(pub String);

impl FromStr for BindingMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OneWay" => Ok(BindingMode::OneWay),
            "TwoWay" => Ok(BindingMode::TwoWay),
            "OneWayToSource" => Ok(BindingMode::OneWayToSource),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

/// Binding configuration.
///
/// # Examples
///
/// ```
/// use console_bind::{BindingMode, BindingOptions};
///
/// let options = BindingOptions::new().with_mode(BindingMode::TwoWay).strict(true);
/// assert!(options.strict);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BindingOptions {
    pub mode: BindingMode,
    /// Propagate traversal and write errors instead of resolving to null.
    pub strict: bool,
}

impl BindingOptions {
    /// One-way, non-strict.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the mode (builder).
    pub fn with_mode(mut self, mode: BindingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set strictness (builder).
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

// ---------------------------------------------------------------------------
// Binding
// ---------------------------------------------------------------------------

/// Which direction the binding is currently writing, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    UpdatingTarget,
    /// Writing the source through the given edge.
    UpdatingSource(EdgeId),
}

struct BindingInner {
    this: Weak<BindingInner>,
    target: Weak<dyn BindingHost>,
    target_info: PropertyInfo,
    path: BindingPath,
    mode: BindingMode,
    strict: bool,
    traversal: RefCell<Traversal>,
    state: Cell<SyncState>,
    target_subscription: Cell<Option<HandlerId>>,
    ancestors: RefCell<Vec<(Weak<dyn BindingHost>, HandlerId)>>,
    last_error: RefCell<Option<BindingError>>,
}

/// A live binding of one target property to a path.
///
/// Dropping a binding performs [`cleanup(true)`](Binding::cleanup).
pub struct Binding {
    inner: Rc<BindingInner>,
}

impl Binding {
    /// Bind `target` on `host` to `path`.
    ///
    /// Parses the path, checks that the target property exists, subscribes to
    /// the host and performs the initial read. Syntax errors and a missing
    /// target are always returned; traversal errors only when `strict`.
    pub fn new<H: BindingHost>(
        host: &Rc<H>,
        target: &str,
        path: &str,
        mode: BindingMode,
        strict: bool,
    ) -> Result<Self, BindingError> {
        Self::with_options(host, target, path, BindingOptions { mode, strict })
    }

    /// Bind with [`BindingOptions`]. See [`Binding::new`].
    pub fn with_options<H: BindingHost>(
        host: &Rc<H>,
        target: &str,
        path: &str,
        options: BindingOptions,
    ) -> Result<Self, BindingError> {
        let path = BindingPath::parse(path)?;
        let host: Rc<dyn BindingHost> = Rc::clone(host) as Rc<dyn BindingHost>;
        let target_info = host.property(target).ok_or_else(|| BindingError::TargetNotFound {
            type_name: host.type_name().to_string(),
            property: target.to_string(),
        })?;

        let inner = Rc::new_cyclic(|this: &Weak<BindingInner>| {
            let weak = this.clone();
            let sink: Rc<dyn Fn(EdgeId)> = Rc::new(move |edge| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_source_changed(edge);
                }
            });
            BindingInner {
                this: this.clone(),
                target: Rc::downgrade(&host),
                target_info,
                path,
                mode: options.mode,
                strict: options.strict,
                traversal: RefCell::new(Traversal::new(options.strict, sink)),
                state: Cell::new(SyncState::Idle),
                target_subscription: Cell::new(None),
                ancestors: RefCell::new(Vec::new()),
                last_error: RefCell::new(None),
            }
        });

        inner.subscribe_target(&*host);
        let binding = Binding { inner };
        binding.inner.refresh(true)?;
        Ok(binding)
    }

    /// Re-evaluate the path and return the current source value.
    ///
    /// Rebuilds the edge chain but does not write the target. After a full
    /// [`cleanup`](Self::cleanup) the value is computed without subscribing.
    pub fn value(&self) -> Result<Value, BindingError> {
        let inner = &self.inner;
        let Some(host) = inner.target.upgrade() else {
            return Ok(Value::Null);
        };
        let root = inner.source_root(&*host);
        let result = if inner.is_bound() {
            inner.traversal.borrow_mut().traverse(&inner.path, &root)
        } else {
            Traversal::new(inner.strict, Rc::new(|_: EdgeId| {})).traverse(&inner.path, &root)
        };
        Ok(result?)
    }

    /// Rebuild the chain and write the target (if the mode reads continuously).
    ///
    /// Does nothing after a full [`cleanup`](Self::cleanup).
    pub fn refresh(&self) -> Result<(), BindingError> {
        if !self.inner.is_bound() {
            return Ok(());
        }
        self.inner.refresh(false).map(|_| ())
    }

    /// Write the target's current value into the leaf step of the chain.
    ///
    /// Does nothing for [`BindingMode::OneWay`] or when the last traversal
    /// did not reach the leaf.
    pub fn update_source(&self) -> Result<(), BindingError> {
        if !self.inner.mode.updates_source() {
            return Ok(());
        }
        self.inner.update_source()
    }

    /// Unsubscribe every edge and ancestor host; with `detach_from_target`
    /// also stop listening to the target host. Idempotent.
    pub fn cleanup(&self, detach_from_target: bool) {
        self.inner.cleanup(detach_from_target);
    }

    /// The last strict-mode error raised while handling a notification.
    pub fn take_error(&self) -> Option<BindingError> {
        self.inner.last_error.borrow_mut().take()
    }

    pub fn mode(&self) -> BindingMode {
        self.inner.mode
    }

    pub fn path(&self) -> &BindingPath {
        &self.inner.path
    }

    /// Name of the bound target property.
    pub fn target(&self) -> &str {
        &self.inner.target_info.name
    }

    pub fn is_strict(&self) -> bool {
        self.inner.strict
    }

    /// Edges attached by the most recent traversal.
    pub fn edge_count(&self) -> usize {
        self.inner.traversal.borrow().edges().len()
    }

    pub fn sync_state(&self) -> SyncState {
        self.inner.state.get()
    }
}

impl Drop for Binding {
    fn drop(&mut self) {
        self.inner.cleanup(true);
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("target", &self.target())
            .field("path", &self.inner.path.to_string())
            .field("mode", &self.inner.mode)
            .field("strict", &self.inner.strict)
            .field("edges", &self.edge_count())
            .finish()
    }
}

impl BindingInner {
    fn is_bound(&self) -> bool {
        self.target_subscription.get().is_some()
    }

    /// A binding of the host's own data context resolves against the parent.
    fn binds_data_context(&self) -> bool {
        self.target_info.name == DATA_CONTEXT
    }

    fn source_root(&self, host: &dyn BindingHost) -> Value {
        if self.binds_data_context() {
            host.parent_host()
                .map(|parent| effective_data_context(&*parent))
                .unwrap_or_default()
        } else {
            effective_data_context(host)
        }
    }

    /// Re-resolve the data context, rebuild the chain and write the target.
    fn refresh(&self, initial: bool) -> Result<Value, BindingError> {
        let Some(host) = self.target.upgrade() else {
            return Ok(Value::Null);
        };
        self.subscribe_ancestors(&*host);

        let root = self.source_root(&*host);
        let value = self.traversal.borrow_mut().traverse(&self.path, &root)?;

        trace!(
            target: "console_bind::binding",
            path = %self.path,
            target = %self.target_info.name,
            value = %value,
            initial,
            "binding refreshed"
        );

        // No traversal was attempted without a data context.
        if root.is_null() {
            return Ok(value);
        }
        let writes_target = if initial {
            self.mode.updates_target() || self.target_info.writable
        } else {
            self.mode.updates_target()
        };
        if writes_target {
            self.write_target(&*host, value.clone())?;
        }
        Ok(value)
    }

    fn write_target(&self, host: &dyn BindingHost, value: Value) -> Result<(), BindingError> {
        let previous = self.state.replace(SyncState::UpdatingTarget);
        let result = host.set_value(&self.target_info.name, value);
        self.state.set(previous);

        match result {
            Ok(()) => Ok(()),
            Err(err) if self.strict => Err(err.into()),
            Err(err) => {
                debug!(
                    target: "console_bind::binding",
                    target = %self.target_info.name,
                    error = %err,
                    "target write failed"
                );
                Ok(())
            }
        }
    }

    fn update_source(&self) -> Result<(), BindingError> {
        let Some(host) = self.target.upgrade() else {
            return Ok(());
        };
        let leaf = self.traversal.borrow().leaf().cloned();
        let Some(leaf) = leaf else {
            debug!(
                target: "console_bind::binding",
                path = %self.path,
                "no leaf step, write-back skipped"
            );
            return Ok(());
        };

        let result = host
            .get_value(&self.target_info.name)
            .map_err(BindingError::from)
            .and_then(|value| {
                let previous = self.state.replace(SyncState::UpdatingSource(leaf.edge()));
                let written = leaf.write(value);
                self.state.set(previous);
                written.map_err(BindingError::from)
            });

        match result {
            Ok(()) => {
                debug!(
                    target: "console_bind::binding",
                    path = %self.path,
                    accessor = %leaf.accessor(),
                    "source updated"
                );
                Ok(())
            }
            Err(err) if self.strict => Err(err),
            Err(err) => {
                debug!(
                    target: "console_bind::binding",
                    path = %self.path,
                    error = %err,
                    "write-back failed"
                );
                Ok(())
            }
        }
    }

    fn cleanup(&self, detach_from_target: bool) {
        self.traversal.borrow_mut().detach();
        self.release_ancestors();
        if !detach_from_target {
            return;
        }
        if let Some(id) = self.target_subscription.take() {
            if let Some(event) = self
                .target
                .upgrade()
                .as_deref()
                .and_then(|host| host.property_changed())
            {
                event.unsubscribe(id);
            }
        }
    }

    // -- notifications -------------------------------------------------------

    fn on_source_changed(&self, edge: EdgeId) {
        if self.state.get() == SyncState::UpdatingSource(edge) {
            return;
        }
        self.refresh_from_notification();
    }

    fn on_target_changed(&self, name: &str) {
        if self.state.get() == SyncState::UpdatingTarget {
            return;
        }
        if name == DATA_CONTEXT || name == PARENT {
            self.refresh_from_notification();
        } else if name == self.target_info.name && self.mode.updates_source() {
            if let Err(err) = self.update_source() {
                self.report(err);
            }
        }
    }

    fn refresh_from_notification(&self) {
        if let Err(err) = self.refresh(false) {
            self.report(err);
        }
    }

    fn report(&self, err: BindingError) {
        warn!(
            target: "console_bind::binding",
            path = %self.path,
            target = %self.target_info.name,
            error = %err,
            "binding update failed"
        );
        *self.last_error.borrow_mut() = Some(err);
    }

    // -- host subscriptions --------------------------------------------------

    fn subscribe_target(&self, host: &dyn BindingHost) {
        let Some(event) = host.property_changed() else {
            return;
        };
        let weak = self.this.clone();
        let id = event.subscribe(move |name| {
            if let Some(inner) = weak.upgrade() {
                inner.on_target_changed(name);
            }
        });
        self.target_subscription.set(Some(id));
    }

    /// Listen to ancestors up to the one that provides the data context.
    fn subscribe_ancestors(&self, host: &dyn BindingHost) {
        self.release_ancestors();
        if !self.binds_data_context() && !host.data_context().is_null() {
            return;
        }

        let mut subscriptions = Vec::new();
        let mut next = host.parent_host();
        while let Some(ancestor) = next {
            if let Some(event) = ancestor.property_changed() {
                let weak = self.this.clone();
                let id = event.subscribe(move |name| {
                    if name != DATA_CONTEXT && name != PARENT {
                        return;
                    }
                    if let Some(inner) = weak.upgrade() {
                        inner.refresh_from_notification();
                    }
                });
                subscriptions.push((Rc::downgrade(&ancestor), id));
            }
            if !ancestor.data_context().is_null() {
                break;
            }
            next = ancestor.parent_host();
        }
        *self.ancestors.borrow_mut() = subscriptions;
    }

    fn release_ancestors(&self) {
        let released = std::mem::take(&mut *self.ancestors.borrow_mut());
        for (ancestor, id) in released {
            if let Some(event) = ancestor.upgrade().as_deref().and_then(|a| a.property_changed()) {
                event.unsubscribe(id);
            }
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
