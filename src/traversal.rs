//! Traversal engine: evaluates a binding path against a live object graph.
//!
//! A [`Traversal`] walks a [`BindingPath`] from a root value and records one
//! [`TraversalEdge`] per (object, accessor) pair it passes through. Each edge
//! subscribes to the object's change notifications and reports through the
//! engine's sink when the step it depends on changes. The chain is owned
//! exclusively by the engine and rebuilt from scratch on every traversal: the
//! previous chain is detached before the first new edge attaches.
//!
//! The engine also records the *leaf step* of the top-level path: the object,
//! accessor and concrete index values that a two-way binding writes back into.

use std::fmt::Write as _;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::object::{
    AccessError, Accessor, Bindable, HandlerId, IndexerInfo, ITEM_INDEXER_NAME,
};
use crate::path::{BindingPath, Index, PathNode};
use crate::value::{Value, ValueType};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from evaluating a binding path.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TraversalError {
    #[error("property '{property}' not found on {type_name}")]
    PropertyNotFound { type_name: String, property: String },
    #[error("{type_name} has no indexer taking {arity} argument(s)")]
    IndexerNotFound { type_name: String, arity: usize },
    #[error("no indexer on {type_name} accepts [{arguments}]")]
    IndexTypeMismatch { type_name: String, arguments: String },
    #[error("null reference at '{step}'")]
    NullReference { step: String },
    #[error(transparent)]
    Access(#[from] AccessError),
}

// ---------------------------------------------------------------------------
// Edges
// ---------------------------------------------------------------------------

/// Identifies an edge. Never reused within one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Subscription {
    Property(HandlerId),
    Collection(HandlerId),
}

/// One resolved (object, accessor) step of the live chain.
#[derive(Debug)]
pub struct TraversalEdge {
    id: EdgeId,
    object: Weak<dyn Bindable>,
    accessor: Accessor,
    indices: Vec<Value>,
    subscription: Option<Subscription>,
}

impl TraversalEdge {
    pub fn id(&self) -> EdgeId {
        self.id
    }

    /// The object, if it is still alive.
    pub fn object(&self) -> Option<Rc<dyn Bindable>> {
        self.object.upgrade()
    }

    pub fn accessor(&self) -> &Accessor {
        &self.accessor
    }

    /// Concrete index values (indexer edges only).
    pub fn indices(&self) -> &[Value] {
        &self.indices
    }

    /// Whether the edge listens for changes.
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    fn is_for(&self, object: &Rc<dyn Bindable>, accessor: &Accessor) -> bool {
        std::ptr::addr_eq(self.object.as_ptr(), Rc::as_ptr(object)) && self.accessor == *accessor
    }

    fn unsubscribe(&mut self) {
        let (Some(subscription), Some(object)) = (self.subscription.take(), self.object.upgrade())
        else {
            return;
        };
        match subscription {
            Subscription::Property(id) => {
                if let Some(event) = object.property_changed() {
                    event.unsubscribe(id);
                }
            }
            Subscription::Collection(id) => {
                if let Some(event) = object.collection_changed() {
                    event.unsubscribe(id);
                }
            }
        }
    }
}

/// The last step of the top-level path: where write-back goes.
#[derive(Debug, Clone)]
pub struct LeafStep {
    edge: EdgeId,
    object: Weak<dyn Bindable>,
    accessor: Accessor,
    indices: Vec<Value>,
}

impl LeafStep {
    /// The edge observing this step.
    pub fn edge(&self) -> EdgeId {
        self.edge
    }

    pub fn accessor(&self) -> &Accessor {
        &self.accessor
    }

    pub fn indices(&self) -> &[Value] {
        &self.indices
    }

    /// Write `value` through the step's accessor.
    pub fn write(&self, value: Value) -> Result<(), TraversalError> {
        let object = self.object.upgrade().ok_or_else(|| TraversalError::NullReference {
            step: self.accessor.to_string(),
        })?;
        match &self.accessor {
            Accessor::Property(info) => {
                if !info.writable {
                    return Err(AccessError::ReadOnly {
                        name: info.name.clone(),
                    }
                    .into());
                }
                object.set_value(&info.name, value)?;
            }
            Accessor::Indexer(indexer) => {
                if !indexer.writable {
                    return Err(AccessError::ReadOnly {
                        name: ITEM_INDEXER_NAME.to_string(),
                    }
                    .into());
                }
                object.set_index(indexer, &self.indices, value)?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

/// An index argument before conversion to the chosen indexer's types.
enum Arg {
    Bool(bool),
    Str(String),
    Number(f64),
    Resolved(Value),
}

impl Arg {
    fn accepted_by(&self, param: ValueType) -> bool {
        match self {
            Arg::Bool(_) => param.accepts(ValueType::Bool),
            Arg::Str(_) => param.accepts(ValueType::String),
            Arg::Number(_) => param == ValueType::Any || param.is_numeric(),
            Arg::Resolved(value) => param.accepts(value.value_type()),
        }
    }

    fn convert(self, param: ValueType) -> Option<Value> {
        match self {
            Arg::Bool(b) => Some(Value::Bool(b)),
            Arg::Str(s) => Some(Value::String(s)),
            Arg::Number(n) => Value::from_number(n, param),
            Arg::Resolved(value) => Some(value),
        }
    }
}

/// Path evaluator owning the live edge chain.
pub struct Traversal {
    strict: bool,
    sink: Rc<dyn Fn(EdgeId)>,
    edges: Vec<TraversalEdge>,
    leaf: Option<LeafStep>,
    next_id: u64,
}

impl Traversal {
    /// Create an engine. `sink` runs whenever a subscribed edge changes.
    pub fn new(strict: bool, sink: Rc<dyn Fn(EdgeId)>) -> Self {
        Self {
            strict,
            sink,
            edges: Vec::new(),
            leaf: None,
            next_id: 0,
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// The edges attached by the most recent traversal.
    pub fn edges(&self) -> &[TraversalEdge] {
        &self.edges
    }

    /// The leaf step of the most recent traversal, if it was reached.
    pub fn leaf(&self) -> Option<&LeafStep> {
        self.leaf.as_ref()
    }

    /// Evaluate `path` against `root`, rebuilding the edge chain.
    ///
    /// A null root resolves to `Null` without attaching anything. Otherwise,
    /// in non-strict mode every failure resolves to `Null`; in strict mode it
    /// is returned. Either way the edges attached before the failure stay
    /// attached.
    pub fn traverse(&mut self, path: &BindingPath, root: &Value) -> Result<Value, TraversalError> {
        self.detach();
        if root.is_null() {
            return Ok(Value::Null);
        }

        match self.walk(path.nodes(), root, true) {
            Ok(value) => Ok(value),
            Err(err) if self.strict => Err(err),
            Err(err) => {
                debug!(
                    target: "console_bind::traversal",
                    path = %path,
                    error = %err,
                    "traversal failed, resolving to null"
                );
                Ok(Value::Null)
            }
        }
    }

    /// Unsubscribe and drop every edge.
    pub fn detach(&mut self) {
        for edge in &mut self.edges {
            edge.unsubscribe();
        }
        self.edges.clear();
        self.leaf = None;
    }

    fn walk(&mut self, nodes: &[PathNode], root: &Value, top_level: bool) -> Result<Value, TraversalError> {
        let mut current = root.clone();

        for (i, node) in nodes.iter().enumerate() {
            let is_leaf = top_level && i + 1 == nodes.len();

            if let Some(name) = &node.property {
                let object = match &current {
                    Value::Object(object) => Rc::clone(object),
                    Value::Null => return Err(TraversalError::NullReference { step: name.clone() }),
                    other => {
                        return Err(TraversalError::PropertyNotFound {
                            type_name: other.type_name().to_string(),
                            property: name.clone(),
                        })
                    }
                };
                let info = object.property(name).ok_or_else(|| TraversalError::PropertyNotFound {
                    type_name: object.type_name().to_string(),
                    property: name.clone(),
                })?;

                let accessor = Accessor::Property(info);
                let edge = self.attach(&object, &accessor, Vec::new());
                if is_leaf {
                    self.leaf = Some(LeafStep {
                        edge,
                        object: Rc::downgrade(&object),
                        accessor,
                        indices: Vec::new(),
                    });
                }
                current = object.get_value(name)?;
            }

            if !node.indices.is_empty() {
                let object = match &current {
                    Value::Object(object) => Rc::clone(object),
                    Value::Null => {
                        return Err(TraversalError::NullReference {
                            step: node.to_string(),
                        })
                    }
                    other => {
                        return Err(TraversalError::IndexerNotFound {
                            type_name: other.type_name().to_string(),
                            arity: node.indices.len(),
                        })
                    }
                };

                let args = self.evaluate_indices(&node.indices, root)?;
                let (indexer, args) = select_indexer(&object, args, &node.indices)?;

                let accessor = Accessor::Indexer(indexer);
                let edge = self.attach(&object, &accessor, args.clone());
                if is_leaf {
                    self.leaf = Some(LeafStep {
                        edge,
                        object: Rc::downgrade(&object),
                        accessor,
                        indices: args.clone(),
                    });
                }
                current = object.get_index(&indexer, &args)?;
            }
        }

        Ok(current)
    }

    /// Evaluate literals directly and nested paths against the root.
    fn evaluate_indices(&mut self, indices: &[Index], root: &Value) -> Result<Vec<Arg>, TraversalError> {
        indices
            .iter()
            .map(|index| {
                Ok(match index {
                    Index::Boolean(b) => Arg::Bool(*b),
                    Index::String(s) => Arg::Str(s.clone()),
                    Index::Number(n) => Arg::Number(*n),
                    Index::Path(nodes) => Arg::Resolved(self.walk(nodes, root, false)?),
                })
            })
            .collect()
    }

    /// Attach an edge for (object, accessor) unless one exists. Returns the
    /// id of the edge covering the pair.
    fn attach(&mut self, object: &Rc<dyn Bindable>, accessor: &Accessor, indices: Vec<Value>) -> EdgeId {
        if let Some(edge) = self.edges.iter().find(|e| e.is_for(object, accessor)) {
            return edge.id;
        }

        let id = EdgeId(self.next_id);
        self.next_id += 1;
        let subscription = self.subscribe(object, accessor, id);

        trace!(
            target: "console_bind::traversal",
            edge = id.0,
            object = object.type_name(),
            accessor = %accessor,
            subscribed = subscription.is_some(),
            "edge attached"
        );

        self.edges.push(TraversalEdge {
            id,
            object: Rc::downgrade(object),
            accessor: accessor.clone(),
            indices,
            subscription,
        });
        id
    }

    fn subscribe(&self, object: &Rc<dyn Bindable>, accessor: &Accessor, id: EdgeId) -> Option<Subscription> {
        let sink = Rc::clone(&self.sink);
        match accessor {
            Accessor::Property(info) => {
                let name = info.name.clone();
                object.property_changed().map(|event| {
                    Subscription::Property(event.subscribe(move |changed| {
                        if changed == name {
                            sink(id);
                        }
                    }))
                })
            }
            Accessor::Indexer(_) => {
                if let Some(event) = object.collection_changed() {
                    return Some(Subscription::Collection(event.subscribe(move |_| sink(id))));
                }
                object.property_changed().map(|event| {
                    Subscription::Property(event.subscribe(move |changed| {
                        if changed == ITEM_INDEXER_NAME {
                            sink(id);
                        }
                    }))
                })
            }
        }
    }
}

impl Drop for Traversal {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Pick the first indexer whose arity matches and whose parameter types accept
/// every argument, then convert the arguments to those types.
fn select_indexer(
    object: &Rc<dyn Bindable>,
    args: Vec<Arg>,
    written: &[Index],
) -> Result<(IndexerInfo, Vec<Value>), TraversalError> {
    let mismatch = || TraversalError::IndexTypeMismatch {
        type_name: object.type_name().to_string(),
        arguments: render_indices(written),
    };

    let mut same_arity = object
        .indexers()
        .iter()
        .filter(|ix| ix.arity() == args.len())
        .peekable();
    if same_arity.peek().is_none() {
        return Err(TraversalError::IndexerNotFound {
            type_name: object.type_name().to_string(),
            arity: args.len(),
        });
    }

    let indexer = *same_arity
        .find(|ix| ix.params.iter().zip(&args).all(|(param, arg)| arg.accepted_by(*param)))
        .ok_or_else(mismatch)?;

    let values = args
        .into_iter()
        .zip(indexer.params)
        .map(|(arg, param)| arg.convert(*param))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(mismatch)?;

    Ok((indexer, values))
}

fn render_indices(indices: &[Index]) -> String {
    let mut out = String::new();
    for (i, index) in indices.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{index}");
    }
    out
}

// ===========================================================================
// Tests
// ===========================================================================
