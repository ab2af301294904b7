//! Edge validation and the two-phase connection gesture.
//!
//! Validation rules are small [`LinkValidator`] implementations that can be
//! chained with [`ValidationResult::and`] or boxed into a [`CompositeValidator`].
//! [`check_structure`] is the fixed chain every edge insertion runs through.
//!
//! [`ConnectionValidator`] models drawing a connection: [`begin`](ConnectionValidator::begin)
//! captures the starting port, [`complete`](ConnectionValidator::complete) checks the
//! release port, orients the pair output-to-input, and applies the anchor redirect.
//! Neither phase touches the graph.

use crate::catalog::PreferredAnchorPorts;
use crate::error::ValidationError;
use crate::graph::{Graph, PortDirection, PortId, PortRef, SignalType};
use tracing::debug;

/// Result of link validation with optional rejection reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(ValidationError),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// Combine two results (AND logic): returns first error if any
    pub fn and(self, other: ValidationResult) -> ValidationResult {
        match self {
            ValidationResult::Valid => other,
            invalid => invalid,
        }
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        match self {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Invalid(err) => Err(err),
        }
    }
}

/// A rule deciding whether `source -> target` may become an edge.
///
/// `source` is expected to name an output port and `target` an input port.
pub trait LinkValidator {
    fn validate(&self, graph: &Graph, source: &PortRef, target: &PortRef) -> ValidationResult;
}

/// Endpoints exist, sit on different nodes, and run output to input.
#[derive(Clone, Copy, Debug, Default)]
pub struct BasicLinkValidator;

impl BasicLinkValidator {
    fn check_end(graph: &Graph, end: &PortRef, direction: PortDirection) -> ValidationResult {
        let Some(node) = graph.node(&end.node_id) else {
            return ValidationResult::Invalid(ValidationError::NodeNotFound(end.node_id.clone()));
        };
        if node.port(&end.port_id, direction).is_some() {
            return ValidationResult::Valid;
        }
        if node.port(&end.port_id, direction.opposite()).is_some() {
            return ValidationResult::Invalid(ValidationError::IncompatibleDirection);
        }
        ValidationResult::Invalid(ValidationError::PortNotFound {
            node_id: end.node_id.clone(),
            port_id: end.port_id.clone(),
            direction,
        })
    }
}

impl LinkValidator for BasicLinkValidator {
    fn validate(&self, graph: &Graph, source: &PortRef, target: &PortRef) -> ValidationResult {
        if source.node_id == target.node_id {
            return ValidationResult::Invalid(ValidationError::SameNode);
        }
        Self::check_end(graph, source, PortDirection::Output)
            .and(Self::check_end(graph, target, PortDirection::Input))
    }
}

/// Both ends carry the same signal type. Missing ports are left to [`BasicLinkValidator`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SignalTypeValidator;

impl LinkValidator for SignalTypeValidator {
    fn validate(&self, graph: &Graph, source: &PortRef, target: &PortRef) -> ValidationResult {
        let source_port = graph.find_port(&source.node_id, &source.port_id, PortDirection::Output);
        let target_port = graph.find_port(&target.node_id, &target.port_id, PortDirection::Input);
        match (source_port, target_port) {
            (Some(s), Some(t)) if s.signal_type != t.signal_type => {
                ValidationResult::Invalid(ValidationError::TypeMismatch {
                    expected: s.signal_type,
                    found: t.signal_type,
                })
            }
            _ => ValidationResult::Valid,
        }
    }
}

/// Validator that prevents duplicate edges
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDuplicatesValidator;

impl LinkValidator for NoDuplicatesValidator {
    fn validate(&self, graph: &Graph, source: &PortRef, target: &PortRef) -> ValidationResult {
        if graph.edge_between(source, target).is_some() {
            ValidationResult::Invalid(ValidationError::DuplicateEdge)
        } else {
            ValidationResult::Valid
        }
    }
}

/// Config edges into the anchor must land on the source kind's preferred port.
#[derive(Clone, Copy, Debug)]
pub struct AnchorPortValidator<'a> {
    preferred: &'a PreferredAnchorPorts,
}

impl<'a> AnchorPortValidator<'a> {
    pub fn new(preferred: &'a PreferredAnchorPorts) -> Self {
        Self { preferred }
    }
}

impl LinkValidator for AnchorPortValidator<'_> {
    fn validate(&self, graph: &Graph, source: &PortRef, target: &PortRef) -> ValidationResult {
        let (Some(source_node), Some(target_node)) =
            (graph.node(&source.node_id), graph.node(&target.node_id))
        else {
            return ValidationResult::Valid;
        };
        let is_config = source_node
            .port(&source.port_id, PortDirection::Output)
            .is_some_and(|p| p.signal_type == SignalType::Config);
        if !target_node.is_anchor || !is_config {
            return ValidationResult::Valid;
        }
        match self.preferred.get(&source_node.kind) {
            Some(expected) if expected == target.port_id => ValidationResult::Valid,
            Some(expected) => ValidationResult::Invalid(ValidationError::AnchorPortMismatch {
                expected: expected.to_string(),
                found: target.port_id.clone(),
            }),
            None => ValidationResult::Invalid(ValidationError::NoPreferredAnchorPort(
                source_node.kind.clone(),
            )),
        }
    }
}

/// Composite validator that combines multiple validators
///
/// All validators must return Valid for the edge to be valid (AND logic).
/// Returns the first error encountered.
#[derive(Default)]
pub struct CompositeValidator<'a> {
    validators: Vec<Box<dyn LinkValidator + 'a>>,
}

impl<'a> CompositeValidator<'a> {
    pub fn new() -> Self {
        Self { validators: Vec::new() }
    }

    /// Validators are checked in the order they were added.
    pub fn add<V: LinkValidator + 'a>(mut self, validator: V) -> Self {
        self.validators.push(Box::new(validator));
        self
    }
}

impl LinkValidator for CompositeValidator<'_> {
    fn validate(&self, graph: &Graph, source: &PortRef, target: &PortRef) -> ValidationResult {
        for v in &self.validators {
            let result = v.validate(graph, source, target);
            if !result.is_valid() {
                return result;
            }
        }
        ValidationResult::Valid
    }
}

/// Convenience function to validate an edge with any validator
pub fn validate_link<V>(graph: &Graph, source: &PortRef, target: &PortRef, validator: &V) -> ValidationResult
where
    V: LinkValidator + ?Sized,
{
    validator.validate(graph, source, target)
}

/// The rules every edge must satisfy. Returns the edge's signal type.
pub fn check_structure(graph: &Graph, source: &PortRef, target: &PortRef) -> Result<SignalType, ValidationError> {
    BasicLinkValidator
        .validate(graph, source, target)
        .and(SignalTypeValidator.validate(graph, source, target))
        .and(NoDuplicatesValidator.validate(graph, source, target))
        .into_result()?;
    graph
        .find_port(&source.node_id, &source.port_id, PortDirection::Output)
        .map(|p| p.signal_type)
        .ok_or_else(|| ValidationError::PortNotFound {
            node_id: source.node_id.clone(),
            port_id: source.port_id.clone(),
            direction: PortDirection::Output,
        })
}

/// The first half of a connection gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConnection {
    pub origin: PortRef,
    pub signal_type: SignalType,
    pub direction: PortDirection,
}

/// A completed gesture, oriented output to input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConnection {
    pub source: PortRef,
    pub target: PortRef,
    /// The port actually released over, when the anchor redirect replaced it.
    pub redirected_from: Option<PortId>,
}

/// Decides whether a drawn connection may become an edge and which port it binds to.
#[derive(Debug, Clone, Default)]
pub struct ConnectionValidator {
    preferred: PreferredAnchorPorts,
}

impl ConnectionValidator {
    pub fn new(preferred: PreferredAnchorPorts) -> Self {
        Self { preferred }
    }

    pub fn preferred_ports(&self) -> &PreferredAnchorPorts {
        &self.preferred
    }

    /// Capture the port a connection starts from.
    pub fn begin(
        &self,
        graph: &Graph,
        origin: PortRef,
        direction: PortDirection,
    ) -> Result<PendingConnection, ValidationError> {
        let port = graph
            .find_port(&origin.node_id, &origin.port_id, direction)
            .ok_or_else(|| ValidationError::PortNotFound {
                node_id: origin.node_id.clone(),
                port_id: origin.port_id.clone(),
                direction,
            })?;
        Ok(PendingConnection {
            signal_type: port.signal_type,
            direction,
            origin,
        })
    }

    /// Check the port a connection was released over and resolve the final endpoints.
    pub fn complete(
        &self,
        graph: &Graph,
        pending: &PendingConnection,
        candidate: &PortRef,
        candidate_direction: PortDirection,
    ) -> Result<ResolvedConnection, ValidationError> {
        let port = graph
            .find_port(&candidate.node_id, &candidate.port_id, candidate_direction)
            .ok_or_else(|| ValidationError::PortNotFound {
                node_id: candidate.node_id.clone(),
                port_id: candidate.port_id.clone(),
                direction: candidate_direction,
            })?;
        if candidate_direction == pending.direction {
            return Err(ValidationError::IncompatibleDirection);
        }
        if candidate.node_id == pending.origin.node_id {
            return Err(ValidationError::SameNode);
        }
        if port.signal_type != pending.signal_type {
            return Err(ValidationError::TypeMismatch {
                expected: pending.signal_type,
                found: port.signal_type,
            });
        }

        let (source, target) = match pending.direction {
            PortDirection::Output => (pending.origin.clone(), candidate.clone()),
            PortDirection::Input => (candidate.clone(), pending.origin.clone()),
        };
        match self.redirect_target(graph, &source, &target, pending.signal_type) {
            Some(redirected) => {
                debug!(
                    from = %target,
                    to = %redirected,
                    "redirecting connection to preferred anchor port"
                );
                Ok(ResolvedConnection {
                    redirected_from: Some(target.port_id),
                    source,
                    target: redirected,
                })
            }
            None => Ok(ResolvedConnection {
                source,
                target,
                redirected_from: None,
            }),
        }
    }

    /// The preferred anchor port a config connection must bind to, if it differs
    /// from `target`.
    pub fn redirect_target(
        &self,
        graph: &Graph,
        source: &PortRef,
        target: &PortRef,
        signal_type: SignalType,
    ) -> Option<PortRef> {
        if signal_type != SignalType::Config {
            return None;
        }
        if !graph.node(&target.node_id)?.is_anchor {
            return None;
        }
        let kind = &graph.node(&source.node_id)?.kind;
        let preferred = self.preferred.get(kind)?;
        (preferred != target.port_id).then(|| PortRef::new(target.node_id.clone(), preferred))
    }

    /// Whether auto-snap may create `source -> target`.
    pub fn is_snap_eligible(&self, graph: &Graph, source: &PortRef, target: &PortRef) -> bool {
        check_structure(graph, source, target).is_ok()
            && AnchorPortValidator::new(&self.preferred)
                .validate(graph, source, target)
                .is_valid()
    }
}
