//! Template environment with the page templates compiled in.

use minijinja::Environment;

use super::view::PageView;

const PAGE: &str = "index.html";

#[derive(Debug)]
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    /// Parse all templates. Fails only on a syntax error in a template.
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template(PAGE, include_str!("../../templates/index.html"))?;
        env.add_template("chat.html", include_str!("../../templates/chat.html"))?;
        env.add_template("history.html", include_str!("../../templates/history.html"))?;
        Ok(Self { env })
    }

    pub fn render_page(&self, view: &PageView<'_>) -> Result<String, minijinja::Error> {
        self.env.get_template(PAGE)?.render(view)
    }
}
