pub mod membership;
pub mod organization;
pub mod principal;
pub mod resource;
pub mod topic;

pub use membership::{Membership, MembershipRecord, MembershipSnapshot, NewMember, OrgRole};
pub use organization::{NewOrganization, Organization, OrganizationStatus};
pub use principal::Principal;
pub use resource::{
    EventDescriptor, MembershipDescriptor, Operation, OrganizationDescriptor, ResourceDescriptor,
    TopicDescriptor,
};
pub use topic::{Event, NewEvent, NewTopic, Topic};
