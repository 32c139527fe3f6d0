use super::Api;
use super::CommandList;
use super::ResourceState;

/// A GPU resource together with the state its last recorded barrier left it in.
pub struct TrackedResource<A: Api> {
    resource: A::Resource,
    size: u64,
    state: ResourceState,
}

impl<A: Api> TrackedResource<A> {
    pub fn new(resource: A::Resource, size: u64, state: ResourceState) -> Self {
        Self {
            resource,
            size,
            state,
        }
    }

    pub fn resource(&self) -> &A::Resource {
        &self.resource
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn state(&self) -> ResourceState {
        self.state
    }

    /// Records a barrier into `list` if the resource is not already in `required`.
    /// Returns whether a barrier was recorded.
    pub fn transition(&mut self, list: &mut A::CommandList, required: ResourceState) -> bool {
        if self.state == required {
            return false;
        }
        list.resource_barrier(&self.resource, self.state, required);
        self.state = required;
        true
    }
}
