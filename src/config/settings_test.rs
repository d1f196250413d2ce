// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::Settings;

#[test]
fn test_default_settings_load() {
    let settings = Settings::new().unwrap();

    assert!(!settings.database.url.is_empty());
    assert!(!settings.redis.url.is_empty());
    assert_eq!(settings.storage.storage_type, "local");
    assert_eq!(settings.http.timeout_secs, 100);
    assert_eq!(settings.pool.num_workers, 10);
    assert_eq!(settings.listener.in_queue, "fetch-in");
    assert_eq!(settings.listener.out_queue.as_deref(), Some("fetch-out"));
    assert!(settings.http.default_headers.is_empty());
}

#[test]
fn test_env_override() {
    // user_agent is not asserted by the defaults test, so the two tests can
    // run in parallel without the env var bleeding between them.
    std::env::set_var("FETCHRS__HTTP__USER_AGENT", "fetchrs-test/9.9");
    let settings = Settings::new().unwrap();
    assert_eq!(settings.http.user_agent, "fetchrs-test/9.9");
    std::env::remove_var("FETCHRS__HTTP__USER_AGENT");
}
