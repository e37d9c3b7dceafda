mod application;
mod presentation;

fn main() -> hotfix_core::Result<()> {
    application::run()
}
