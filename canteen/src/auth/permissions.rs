//! Role based access control.
//!
//! Each [`Role`] grants a fixed set of [`Permission`]s. Handlers declare what they need with
//! the [`RequiresPermission`] extractor and refine "own" scopes themselves.

use std::marker::PhantomData;
use std::ops::Deref;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    AppState,
    api::models::users::{CurrentUser, Role},
    errors::{Error, Result},
    types::{Operation, Permission, Resource},
};

const SUPER_ADMIN: &[Permission] = &[
    Permission::Allow(Resource::Registry, Operation::CreateAll),
    Permission::Allow(Resource::Registry, Operation::ReadAll),
];

const SCHOOL_ADMIN: &[Permission] = &[
    Permission::Allow(Resource::Registry, Operation::CreateOwn),
    Permission::Allow(Resource::Registry, Operation::ReadOwn),
];

const CANTEEN_MANAGER: &[Permission] = &[Permission::Allow(Resource::Registry, Operation::ReadOwn)];

const PARENT: &[Permission] = &[
    Permission::Allow(Resource::Children, Operation::CreateOwn),
    Permission::Allow(Resource::Children, Operation::ReadOwn),
];

/// Permissions granted to a role
pub fn role_permissions(role: Role) -> &'static [Permission] {
    match role {
        Role::SuperAdmin => SUPER_ADMIN,
        Role::SchoolAdmin => SCHOOL_ADMIN,
        Role::CanteenManager => CANTEEN_MANAGER,
        Role::Parent => PARENT,
    }
}

pub fn has_permission(user: &CurrentUser, resource: Resource, operation: Operation) -> bool {
    role_permissions(user.role).contains(&Permission::Allow(resource, operation))
}

/// The `*All` operation implies its `*Own` counterpart.
pub fn permits(user: &CurrentUser, resource: Resource, operation: Operation) -> bool {
    let broader = match operation {
        Operation::CreateOwn => Some(Operation::CreateAll),
        Operation::ReadOwn => Some(Operation::ReadAll),
        Operation::CreateAll | Operation::ReadAll => None,
    };
    has_permission(user, resource, operation) || broader.is_some_and(|op| has_permission(user, resource, op))
}

pub fn can_read_all_resources(user: &CurrentUser, resource: Resource) -> bool {
    has_permission(user, resource, Operation::ReadAll)
}

pub fn can_create_all_resources(user: &CurrentUser, resource: Resource) -> bool {
    has_permission(user, resource, Operation::CreateAll)
}

pub fn forbidden(resource: Resource, operation: Operation) -> Error {
    Error::InsufficientPermissions {
        required: Permission::Allow(resource, operation),
        action: operation,
        resource: resource.to_string(),
    }
}

pub mod resource {
    use crate::types::Resource;

    pub trait ResourceMarker: Send + Sync + 'static {
        const RESOURCE: Resource;
    }

    pub struct Registry;
    pub struct Children;

    impl ResourceMarker for Registry {
        const RESOURCE: Resource = Resource::Registry;
    }

    impl ResourceMarker for Children {
        const RESOURCE: Resource = Resource::Children;
    }
}

pub mod operation {
    use crate::types::Operation;

    pub trait OperationMarker: Send + Sync + 'static {
        const OPERATION: Operation;
    }

    pub struct CreateAll;
    pub struct CreateOwn;
    pub struct ReadAll;
    pub struct ReadOwn;

    impl OperationMarker for CreateAll {
        const OPERATION: Operation = Operation::CreateAll;
    }

    impl OperationMarker for CreateOwn {
        const OPERATION: Operation = Operation::CreateOwn;
    }

    impl OperationMarker for ReadAll {
        const OPERATION: Operation = Operation::ReadAll;
    }

    impl OperationMarker for ReadOwn {
        const OPERATION: Operation = Operation::ReadOwn;
    }
}

/// Extractor that authenticates the caller and checks a permission in one step
pub struct RequiresPermission<R, O> {
    user: CurrentUser,
    _marker: PhantomData<(R, O)>,
}

impl<R, O> RequiresPermission<R, O> {
    pub fn into_inner(self) -> CurrentUser {
        self.user
    }
}

impl<R, O> Deref for RequiresPermission<R, O> {
    type Target = CurrentUser;

    fn deref(&self) -> &CurrentUser {
        &self.user
    }
}

impl<R, O> FromRequestParts<AppState> for RequiresPermission<R, O>
where
    R: resource::ResourceMarker,
    O: operation::OperationMarker,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !permits(&user, R::RESOURCE, O::OPERATION) {
            return Err(forbidden(R::RESOURCE, O::OPERATION));
        }
        Ok(Self {
            user,
            _marker: PhantomData,
        })
    }
}
