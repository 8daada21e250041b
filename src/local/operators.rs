//! Operator sugar.
//!
//! A few operators on library types lower to method calls. The table is only consulted after the built-in rules
//! rejected the operands, so sugar never changes the meaning of code that already compiles.

use lava_core::lang::operators::OperatorId;
use lava_core::lang::well_known;

use super::{LocalContext, MethodMatch};
use crate::types::IType;

/// An operator position that may be overridden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideOp {
    Binary(OperatorId),
    /// Prefix `!`.
    Not,
    /// `receiver[index]`.
    Index,
}

/// Receiver class, operator and the method it lowers to.
const SUGAR: &[(&str, OverrideOp, &str)] = &[
    (well_known::STRING, OverrideOp::Binary(OperatorId::Star), "repeat"),
    (well_known::STRING, OverrideOp::Not, "isEmpty"),
    (well_known::MAP, OverrideOp::Index, "get"),
    (well_known::LIST, OverrideOp::Index, "get"),
    (well_known::STRING_BUILDER, OverrideOp::Binary(OperatorId::Shl), "append"),
];

impl LocalContext<'_> {
    /// Method an operator applied to `left` (and `right`, for binary and index forms) lowers to.
    pub fn operator_override(&self, op: OverrideOp, left: &IType, right: Option<&IType>) -> Option<MethodMatch> {
        let receiver = left.class_name()?;
        let args: Vec<IType> = right.into_iter().cloned().collect();
        SUGAR
            .iter()
            .filter(|(owner, sugar_op, _)| *sugar_op == op && self.instance_of(&receiver, owner))
            .find_map(|(_, _, method)| {
                let candidates = self.helper(&receiver)?.find_method(self.global(), method).ok()?;
                let candidates: Vec<_> =
                    candidates.into_iter().filter(|m| !m.method().is_static()).collect();
                self.select_method(left, &candidates, &args)
            })
    }
}
