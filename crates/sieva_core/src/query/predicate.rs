//! Predicate compilation.

use crate::registry::{EntityDescriptor, Registry};
use sieva_model::{
    Compare, Condition, Entity, FieldRead, FieldRole, FieldValue, MatchMode, SearchMode,
    FIELD_IS_DISABLED,
};

/// Caller-supplied customization of a compiled condition list.
///
/// The hook receives a *clone* of the filter and the mutable pre-built
/// condition list: it may add conditions, remove pre-built ones, or
/// inspect the filter copy. Mutating the copy never changes the
/// time-range or soft-delete conditions, which are compiled from the
/// original filter after the hook returns.
pub trait ConditionHook<E: Entity>: Send + Sync {
    /// Adjusts the pre-built conditions for one compilation.
    fn customize(&self, filter: &mut E, conditions: &mut Vec<Condition>);
}

impl<E: Entity, F> ConditionHook<E> for F
where
    F: Fn(&mut E, &mut Vec<Condition>) + Send + Sync,
{
    fn customize(&self, filter: &mut E, conditions: &mut Vec<Condition>) {
        self(filter, conditions);
    }
}

/// Compiles a filter entity into an ordered, ANDed condition list.
///
/// Output order: registry-order field conditions, then hook additions,
/// then time-range bounds, then (when `soft_delete` is set) a trailing
/// not-disabled condition. The engine never introduces an implicit OR.
///
/// Skip rules per field: a vacant value (null, blank text, numeric zero)
/// contributes no condition, except that a column marked `search_empty`
/// compiles an explicitly blank string into equality on the empty
/// string. `Exact` mode emits equality for every field regardless of its
/// search kind; `Loose` mode honors prefix/substring/skip kinds.
///
/// Reference fields recurse into the target type's descriptor set when
/// the target is registered; unknown targets fall back to exact equality
/// per nested field rather than dropping the constraint.
#[must_use]
pub fn compile<E: Entity>(
    registry: &Registry,
    filter: &E,
    mode: MatchMode,
    hook: Option<&dyn ConditionHook<E>>,
    soft_delete: bool,
) -> Vec<Condition> {
    let descriptor = registry.describe::<E>();
    let mut conditions = compile_fields(registry, &descriptor, filter, mode);

    if let Some(hook) = hook {
        let mut copy = filter.clone();
        hook.customize(&mut copy, &mut conditions);
    }

    conditions.extend(compile_ranges(&descriptor, filter));

    if soft_delete {
        conditions.push(Condition::cmp(
            FIELD_IS_DISABLED,
            Compare::Ne,
            FieldValue::Bool(true),
        ));
    }

    conditions
}

fn compile_fields(
    registry: &Registry,
    descriptor: &EntityDescriptor,
    source: &dyn FieldRead,
    mode: MatchMode,
) -> Vec<Condition> {
    let mut out = Vec::new();

    for field in &descriptor.fields {
        match &field.role {
            FieldRole::Column {
                search,
                search_empty,
                ..
            } => {
                let value = source.read_field(&field.name);
                let blank_searched = *search_empty
                    && matches!(&value, FieldValue::Text(s) if s.is_empty());
                if value.is_vacant() && !blank_searched {
                    continue;
                }

                let op = if blank_searched {
                    Compare::Eq
                } else {
                    match mode {
                        MatchMode::Exact => Compare::Eq,
                        MatchMode::Loose => match search {
                            SearchMode::Exact => Compare::Eq,
                            SearchMode::Prefix => Compare::Prefix,
                            SearchMode::Substring => Compare::Contains,
                            SearchMode::Skip => continue,
                        },
                    }
                };
                out.push(Condition::cmp(&field.name, op, value));
            }
            FieldRole::Reference { target } => {
                let value = source.read_field(&field.name);
                let Some(nested) = value.as_nested() else {
                    continue;
                };
                if nested.is_empty() {
                    continue;
                }

                let inner = match registry.describe_collection(target) {
                    Some(target_descriptor) => {
                        let mut inner =
                            compile_fields(registry, &target_descriptor, nested, mode);
                        inner.extend(compile_ranges(&target_descriptor, nested));
                        inner
                    }
                    None => nested
                        .iter()
                        .filter(|(_, v)| !v.is_vacant())
                        .map(|(n, v)| Condition::eq(n, v.clone()))
                        .collect(),
                };
                if inner.is_empty() {
                    continue;
                }
                out.push(Condition::Join {
                    relation: field.name.clone(),
                    target: target.clone(),
                    conditions: inner,
                });
            }
            // Range bounds are appended after the field loop.
            FieldRole::RangeFrom { .. } | FieldRole::RangeTo { .. } => {}
        }
    }

    out
}

fn compile_ranges(descriptor: &EntityDescriptor, source: &dyn FieldRead) -> Vec<Condition> {
    descriptor
        .range_bounds()
        .filter_map(|(bound, column, is_from)| {
            let value = source.read_field(bound);
            if value.is_vacant() {
                return None;
            }
            let op = if is_from { Compare::Ge } else { Compare::Lt };
            Some(Condition::cmp(column, op, value))
        })
        .collect()
}
