use bon::Builder;

/// Entitlement policy: the access cap and the two validity windows.
///
/// The reference policy is 12 hour sessions and 3 accesses per 90 day
/// counter window.
#[derive(Builder, Debug, Clone)]
pub struct Policy {
    /// Paid-class accesses granted per counter window.
    #[builder(default = 3)]
    pub access_cap: u32,

    /// Session credential lifetime in seconds.
    #[builder(default = 12 * 60 * 60)]
    pub session_window_secs: u64,

    /// Counter credential lifetime in seconds. Independent of, and much
    /// longer than, the session window.
    #[builder(default = 90 * 24 * 60 * 60)]
    pub counter_window_secs: u64,
}

impl Default for Policy {
    fn default() -> Self {
        Policy::builder().build()
    }
}
