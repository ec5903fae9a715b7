//! Project role provisioning.
//!
//! # Responsibility
//! - Derive the canonical role identifiers of a project from its code.
//! - Choose and grant the creator's admin role.
//! - Build the project-local access lists.
//!
//! # Invariants
//! - Role identifiers are a pure function of `project.code`.
//! - Roles are derived once, after the code is final; later code changes
//!   never rename issued roles.

use crate::access::permission_store::{AccessResult, GrantSubject, PermissionStore, RoleGrant};
use crate::model::actor::Actor;
use crate::model::project::{Project, ProjectAccess};
use crate::model::role::{RoleId, RoleKind, RoleOrg};
use log::info;

/// Full role set of one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRoles {
    pub admin: RoleId,
    pub proponent_admin: RoleId,
    pub eao_invitee: RoleId,
    pub proponent_invitee: RoleId,
    pub eao_member: RoleId,
    pub pro_member: RoleId,
}

impl ProjectRoles {
    pub fn for_code(code: &str) -> Self {
        Self {
            admin: RoleId::new(code, RoleOrg::Eao, RoleKind::Admin),
            proponent_admin: RoleId::new(code, RoleOrg::Pro, RoleKind::Admin),
            eao_invitee: RoleId::new(code, RoleOrg::Eao, RoleKind::Invitee),
            proponent_invitee: RoleId::new(code, RoleOrg::Pro, RoleKind::Invitee),
            eao_member: RoleId::new(code, RoleOrg::Eao, RoleKind::Member),
            pro_member: RoleId::new(code, RoleOrg::Pro, RoleKind::Member),
        }
    }

    pub fn all(&self) -> [&RoleId; 6] {
        [
            &self.admin,
            &self.proponent_admin,
            &self.eao_invitee,
            &self.proponent_invitee,
            &self.eao_member,
            &self.pro_member,
        ]
    }
}

/// Assigns all role fields of `project` from its code.
///
/// Returns the member roles that still need bulk assignment in the
/// permission store.
pub fn init_default_roles(project: &mut Project) -> Vec<RoleId> {
    let roles = ProjectRoles::for_code(&project.code);
    project.admin_role = Some(roles.admin);
    project.proponent_admin_role = Some(roles.proponent_admin);
    project.eao_invitee_role = Some(roles.eao_invitee);
    project.proponent_invitee_role = Some(roles.proponent_invitee);
    project.eao_member = Some(roles.eao_member.clone());
    project.pro_member = Some(roles.pro_member.clone());

    info!(
        "event=roles_init module=lifecycle status=ok code={}",
        project.code
    );
    vec![roles.eao_member, roles.pro_member]
}

/// Picks the admin role the creating actor receives.
///
/// Proponent actors creating a project for their own organization get the
/// proponent admin role. Everyone else, including every platform actor,
/// gets the platform admin role.
pub fn creator_role(project: &Project, actor: &Actor) -> RoleId {
    let roles = ProjectRoles::for_code(&project.code);
    let own_org = project.org_code.as_deref() == Some(actor.org_code.as_str());
    if !actor.is_platform() && own_org {
        roles.proponent_admin
    } else {
        roles.admin
    }
}

/// Grants the creator role to `actor` in the permission store.
pub fn assign_creator_role<P: PermissionStore + ?Sized>(
    store: &P,
    project: &Project,
    actor: &Actor,
) -> AccessResult<RoleId> {
    let role = creator_role(project, actor);
    store.grant_role(
        &GrantSubject::User(actor.username.clone()),
        &RoleGrant::for_role(&role),
    )?;
    Ok(role)
}

/// Default access lists: members read, admins read/write/delete.
pub fn default_access(code: &str) -> ProjectAccess {
    let roles = ProjectRoles::for_code(code);
    let admins = [roles.admin.to_string(), roles.proponent_admin.to_string()];

    let mut access = ProjectAccess::default();
    access.read.extend(admins.iter().cloned());
    access.read.insert(roles.eao_member.to_string());
    access.read.insert(roles.pro_member.to_string());
    access.write.extend(admins.iter().cloned());
    access.delete.extend(admins);
    access
}

/// Stamps default access lists plus full access for the creator's role, so
/// the creating actor can persist and read the project immediately.
pub fn set_roles(project: &mut Project, creator: &RoleId) {
    let mut access = default_access(&project.code);
    let creator = creator.to_string();
    access.read.insert(creator.clone());
    access.write.insert(creator.clone());
    access.delete.insert(creator);
    project.access = access;
}
