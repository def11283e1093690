//! Profile management: capability interface, switch state machine,
//! persisted switch guard and the startup bootstrap

pub mod bootstrap;
pub mod guard;
pub mod host;
pub mod switcher;

pub use bootstrap::{resolve_target, BootstrapReport, ProfileBootstrap, PROFILE_QUERY_KEY};
pub use guard::{SwitchGuard, SWITCH_GUARD_FILE};
pub use host::{
    ArgumentForm, ProfileArgument, ProfileBaseline, ProfileCapability, ProfileCommand,
    ProfileHost, ProfileInfo, ProfileRef,
};
pub use switcher::{ProfileSwitcher, SwitchAttempt, SwitchOutcome, SwitchStrategy};
