//! Fake override synthesis.
//!
//! For one member name of one class, [`resolve_members`] collects the members the class
//! declares and the ones it inherits from each supertype's member scope, groups the inherited
//! candidates by erased signature, and then:
//!
//! - binds every declared member to the inherited group with its signature (if any),
//! - turns every remaining group into a single fake override owned by the class.
//!
//! A group whose candidates disagree on the return type and have no most specific return type
//! is a diamond conflict. It is reported once per class and name; the candidate of the
//! earliest supertype in declaration order becomes the representative, and the fake override
//! overrides only that candidate.

use std::{cmp::Ordering, collections::HashSet, collections::VecDeque, sync::Arc};

use dashmap::DashSet;
use tracing::trace;

use crate::{
    builtins::BuiltInClass,
    descriptors::{CallableMember, ClassRc, Container},
    metadata::flags::{Modality, Visibility},
    module::Module,
    names::{ClassId, Name},
    scopes::MemberScope,
    types::{
        erasure::{return_key, signature_key},
        SignatureKey, TypeSubstitutor,
    },
    Result,
};

/// Out-of-band events emitted at most once per class and member name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum OverrideEvent {
    Conflict,
    Visibility,
}

/// Guard set of events already reported by one scope.
pub(crate) type ReportedEvents = DashSet<(OverrideEvent, Name)>;

struct Candidate<M> {
    member: Arc<M>,
    substitutor: TypeSubstitutor,
    declaring_class: ClassId,
}

/// Resolves the members named `name` of `class`.
///
/// # Arguments
///
/// * `module` - The owning module
/// * `class` - The class whose scope is being computed
/// * `name` - The member name
/// * `declared` - Members named `name` declared by `class` itself
/// * `reported` - Events already reported for `class`
/// * `inherited` - Looks members up by name in a supertype's member scope
///
/// # Errors
/// Propagates resolution errors of supertypes and signatures.
pub(crate) fn resolve_members<M, F>(
    module: &Module,
    class: &ClassRc,
    name: &Name,
    declared: Vec<Arc<M>>,
    reported: &ReportedEvents,
    inherited: F,
) -> Result<Vec<Arc<M>>>
where
    M: CallableMember,
    F: Fn(&MemberScope, &Name) -> Result<Vec<Arc<M>>>,
{
    let max_depth = module.config().max_hierarchy_depth;

    let mut candidates: Vec<Candidate<M>> = Vec::new();
    for supertype in class.supertypes()? {
        let Some(superclass) = supertype.class_descriptor()? else {
            continue;
        };
        let substitutor = TypeSubstitutor::for_supertype(supertype, &superclass)?;
        for member in inherited(&superclass.member_scope(), name)? {
            if !member.visibility().is_inherited()
                || candidates
                    .iter()
                    .any(|candidate| Arc::ptr_eq(&candidate.member, &member))
            {
                continue;
            }
            candidates.push(Candidate {
                member,
                substitutor: substitutor.clone(),
                declaring_class: superclass.class_id().clone(),
            });
        }
    }

    let mut groups: Vec<(SignatureKey, Vec<Candidate<M>>)> = Vec::new();
    for candidate in candidates {
        let key = signature_key(candidate.member.as_ref(), &candidate.substitutor, max_depth)?;
        match groups.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, group)) => group.push(candidate),
            None => groups.push((key, vec![candidate])),
        }
    }

    let mut declared_keys = Vec::with_capacity(declared.len());
    for member in &declared {
        let key = signature_key(member.as_ref(), &TypeSubstitutor::empty(), max_depth)?;
        let overridden = groups
            .iter()
            .find(|(existing, _)| *existing == key)
            .map(|(_, group)| {
                group
                    .iter()
                    .map(|candidate| Arc::clone(&candidate.member))
                    .collect()
            })
            .unwrap_or_default();
        member.bind_overridden(overridden);
        declared_keys.push(key);
    }

    let mut members = declared;
    for (key, group) in groups {
        if declared_keys.contains(&key) {
            continue;
        }
        members.push(fake_override(module, class, name, group, reported)?);
    }
    Ok(members)
}

fn fake_override<M: CallableMember>(
    module: &Module,
    class: &ClassRc,
    name: &Name,
    group: Vec<Candidate<M>>,
    reported: &ReportedEvents,
) -> Result<Arc<M>> {
    let max_depth = module.config().max_hierarchy_depth;

    let mut return_keys = Vec::with_capacity(group.len());
    for candidate in &group {
        return_keys.push(return_key(
            candidate.member.as_ref(),
            &candidate.substitutor,
            max_depth,
        )?);
    }

    let compatible = if return_keys.windows(2).all(|pair| pair[0] == pair[1]) {
        Some(0)
    } else {
        most_specific(module, &return_keys)?
    };

    let (representative, overridden) = match compatible {
        Some(index) => (
            index,
            group
                .iter()
                .map(|candidate| Arc::clone(&candidate.member))
                .collect::<Vec<_>>(),
        ),
        None => {
            if reported.insert((OverrideEvent::Conflict, name.clone())) {
                let declaring: Vec<ClassId> = group
                    .iter()
                    .map(|candidate| candidate.declaring_class.clone())
                    .collect();
                trace!(class = %class.class_id(), member = %name, "diamond override conflict");
                module
                    .error_reporter()
                    .report_override_conflict(class.class_id(), name, &declaring);
            }
            (0, vec![Arc::clone(&group[0].member)])
        }
    };

    let modality = inherited_modality(&group, class.modality());
    let visibility = inherited_visibility(module, class, name, &group, reported);

    let candidate = &group[representative];
    candidate.member.create_fake_override(
        Container::Class(class.self_ref()),
        visibility,
        modality,
        &candidate.substitutor,
        overridden,
    )
}

fn inherited_modality<M: CallableMember>(group: &[Candidate<M>], class_modality: Modality) -> Modality {
    let modality = if group
        .iter()
        .all(|candidate| candidate.member.modality() == Modality::Abstract)
    {
        Modality::Abstract
    } else if group.iter().any(|candidate| {
        matches!(
            candidate.member.modality(),
            Modality::Open | Modality::Abstract
        )
    }) {
        Modality::Open
    } else {
        Modality::Final
    };

    if modality == Modality::Open && class_modality == Modality::Final {
        Modality::Final
    } else {
        modality
    }
}

fn inherited_visibility<M: CallableMember>(
    module: &Module,
    class: &ClassRc,
    name: &Name,
    group: &[Candidate<M>],
    reported: &ReportedEvents,
) -> Visibility {
    let visibilities: Vec<Visibility> = group
        .iter()
        .map(|candidate| candidate.member.visibility())
        .collect();

    let mut chosen = visibilities[0];
    for &visibility in &visibilities[1..] {
        if chosen.compare(visibility) == Some(Ordering::Less) {
            chosen = visibility;
        }
    }

    if visibilities
        .iter()
        .all(|&visibility| chosen.compare(visibility).is_some())
    {
        return chosen;
    }

    if reported.insert((OverrideEvent::Visibility, name.clone())) {
        module.error_reporter().report_cannot_infer_visibility(
            class.class_id(),
            name,
            &visibilities,
            Visibility::Public,
        );
    }
    Visibility::Public
}

/// Index of the return type that is a subclass of all others, if there is one.
fn most_specific(module: &Module, return_keys: &[ClassId]) -> Result<Option<usize>> {
    for (index, candidate) in return_keys.iter().enumerate() {
        let mut specific = true;
        for other in return_keys {
            if !is_subclass(module, candidate, other)? {
                specific = false;
                break;
            }
        }
        if specific {
            return Ok(Some(index));
        }
    }
    Ok(None)
}

/// Breadth-first walk up the supertype graph from `sub`, bounded by the configured depth.
fn is_subclass(module: &Module, sub: &ClassId, sup: &ClassId) -> Result<bool> {
    if sub == sup || *sup == BuiltInClass::Any.class_id() {
        return Ok(true);
    }

    let max_depth = module.config().max_hierarchy_depth;
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([(sub.clone(), 0usize)]);
    while let Some((current, depth)) = queue.pop_front() {
        if depth >= max_depth || !visited.insert(current.clone()) {
            continue;
        }
        let Some(class) = module.find_class(&current)? else {
            continue;
        };
        for supertype in class.supertypes()? {
            if let Some(id) = supertype.class_id()? {
                if &id == sup {
                    return Ok(true);
                }
                queue.push_back((id, depth + 1));
            }
        }
    }
    Ok(false)
}
