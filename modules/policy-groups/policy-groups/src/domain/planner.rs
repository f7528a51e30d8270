//! Permission planning for the named-policy-in-group resource.
//!
//! Maps (HTTP verb, existence state) to the exact list of checks the
//! authorization engine must grant before the request may proceed.
//! Pure; storage was consulted once during resolution and is not
//! touched again here.

use policy_groups_sdk::{
    Action, AssociationLookup, Container, LookupState, ObjectKind, PermissionCheck,
    PermissionPlan, Prerequisite, Verb,
};

use super::error::DomainError;

/// Compute the permission plan for a verb against a resolved lookup.
///
/// Decision table, in priority order:
/// 1. Association found (any verb): the verb's action on both the
///    policy and the group, using the denormalized authz ids carried by
///    the association. This holds for DELETE as well: the object being
///    deleted is the association, yet delete rights on both referenced
///    objects are still required.
/// 2. Association missing, PUT: per prerequisite, the verb's action on
///    the object if it exists, otherwise create-in-container for the
///    object's kind.
/// 3. Association missing, GET/DELETE: halt with a not-found message;
///    authorization is never evaluated on this branch.
///
/// # Errors
///
/// Any other combination is a programming error and yields
/// [`DomainError::UnexpectedState`].
pub fn plan(verb: Verb, lookup: &AssociationLookup) -> Result<PermissionPlan, DomainError> {
    let Some(action) = verb.action() else {
        return Err(out_of_table(verb));
    };

    match &lookup.state {
        LookupState::Found(record) => Ok(PermissionPlan::Required(vec![
            PermissionCheck::Object {
                object: ObjectKind::Policy,
                authz_id: record.policy_authz_id,
                action,
            },
            PermissionCheck::Object {
                object: ObjectKind::PolicyGroup,
                authz_id: record.group_authz_id,
                action,
            },
        ])),
        LookupState::Missing { policy, group } => match verb {
            Verb::Put => Ok(PermissionPlan::Required(vec![
                prerequisite_check(*policy, ObjectKind::Policy, Container::Policies, action),
                prerequisite_check(
                    *group,
                    ObjectKind::PolicyGroup,
                    Container::PolicyGroups,
                    action,
                ),
            ])),
            Verb::Get | Verb::Delete => Ok(PermissionPlan::HaltNotFound {
                message: format!(
                    "Cannot load policy {} in policy group {}",
                    lookup.policy_name, lookup.group_name
                ),
            }),
            Verb::Post => Err(out_of_table(verb)),
        },
    }
}

fn prerequisite_check(
    prerequisite: Prerequisite,
    object: ObjectKind,
    container: Container,
    action: Action,
) -> PermissionCheck {
    match prerequisite {
        Prerequisite::Found { authz_id, .. } => PermissionCheck::Object {
            object,
            authz_id,
            action,
        },
        Prerequisite::NotFound => PermissionCheck::CreateInContainer { container },
    }
}

fn out_of_table(verb: Verb) -> DomainError {
    DomainError::unexpected_state(format!(
        "verb {} is outside the named-policy decision table",
        verb.as_str()
    ))
}
