#[derive(Clone)]
pub struct AppConfig {
    pub usernames: Vec<String>,
    pub log_level: String,
    pub provider_url: String,
    pub provider_token: Option<String>,
    pub tabstats_url: Option<String>,
    pub influx_url: String,
    pub influx_token: String,
    pub influx_org: String,
    pub influx_bucket: String,
    pub collect_cron: String,
    pub metadata_refresh_secs: u64,
    pub profile_cache_ttl_secs: u64,
    pub category_timeout_secs: u64,
    pub max_concurrent_users: usize,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub sink_batch_size: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("usernames", &self.usernames)
            .field("log_level", &self.log_level)
            .field("provider_url", &self.provider_url)
            .field(
                "provider_token",
                &self.provider_token.as_ref().map(|_| "[redacted]"),
            )
            .field("tabstats_url", &self.tabstats_url)
            .field("influx_url", &self.influx_url)
            .field("influx_token", &"[redacted]")
            .field("influx_org", &self.influx_org)
            .field("influx_bucket", &self.influx_bucket)
            .field("collect_cron", &self.collect_cron)
            .field("metadata_refresh_secs", &self.metadata_refresh_secs)
            .field("profile_cache_ttl_secs", &self.profile_cache_ttl_secs)
            .field("category_timeout_secs", &self.category_timeout_secs)
            .field("max_concurrent_users", &self.max_concurrent_users)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("sink_batch_size", &self.sink_batch_size)
            .finish()
    }
}
