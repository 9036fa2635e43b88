use seo_engine::config::Config;
use seo_engine::routes;

#[rocket::launch]
fn rocket() -> _ {
    env_logger::init();

    let config = Config::load().expect("Failed to load engine config");
    if config.llm.provider.is_empty() {
        log::info!("No LLM provider configured, drafts use built-in templates");
    } else {
        log::info!("LLM provider: {}", config.llm.provider);
    }

    routes::build(config)
}
