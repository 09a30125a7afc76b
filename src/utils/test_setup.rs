use std::sync::Once;

static INIT: Once = Once::new();

pub fn setup_test_env() {
    INIT.call_once(|| {
        dotenvy::dotenv().ok();
        let _ = env_logger::builder().is_test(true).try_init();
    });
}
