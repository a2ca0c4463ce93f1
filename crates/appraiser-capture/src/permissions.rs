use appraiser_core::Permission;

/// Answers whether a runtime permission is currently granted
pub trait PermissionGate: Send + Sync {
    fn is_granted(&self, permission: Permission) -> bool;
}

/// Fixed permission answers, for headless runs and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticPermissions {
    camera: bool,
    fine_location: bool,
}

impl StaticPermissions {
    pub fn new(camera: bool, fine_location: bool) -> Self {
        Self {
            camera,
            fine_location,
        }
    }

    pub fn all_granted() -> Self {
        Self::new(true, true)
    }

    pub fn revoke(mut self, permission: Permission) -> Self {
        match permission {
            Permission::Camera => self.camera = false,
            Permission::FineLocation => self.fine_location = false,
        }
        self
    }
}

impl Default for StaticPermissions {
    fn default() -> Self {
        Self::all_granted()
    }
}

impl PermissionGate for StaticPermissions {
    fn is_granted(&self, permission: Permission) -> bool {
        match permission {
            Permission::Camera => self.camera,
            Permission::FineLocation => self.fine_location,
        }
    }
}
