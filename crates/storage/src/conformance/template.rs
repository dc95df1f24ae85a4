use std::future::Future;

use super::{make_template, TestResult};
use crate::record::FormTemplate;
use crate::TemplateStore;

pub(super) async fn run_template_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: TemplateStore,
    F: Fn(Vec<FormTemplate>) -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "template",
            "seeded_template_resolves_verbatim",
            seeded_template_resolves_verbatim(factory).await,
        ),
        TestResult::from_result(
            "template",
            "absent_template_returns_none",
            absent_template_returns_none(factory).await,
        ),
    ]
}

async fn seeded_template_resolves_verbatim<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TemplateStore,
    F: Fn(Vec<FormTemplate>) -> Fut,
    Fut: Future<Output = S>,
{
    let mut template = make_template("mcpar-1");
    template
        .extra
        .insert("basePath".to_string(), "/mcpar".into());
    let store = factory(vec![template.clone(), make_template("mcpar-2")]).await;

    let found = store
        .get_template("mcpar-1")
        .await
        .map_err(|e| format!("get: {e}"))?
        .ok_or("seeded template missing")?;
    if found != template {
        return Err(format!("template changed in storage: {found:?}"));
    }
    Ok(())
}

async fn absent_template_returns_none<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: TemplateStore,
    F: Fn(Vec<FormTemplate>) -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory(vec![make_template("mcpar-1")]).await;
    match store.get_template("badId").await {
        Ok(None) => Ok(()),
        Ok(Some(t)) => Err(format!("expected None, got {}", t.id)),
        Err(e) => Err(format!("get: {e}")),
    }
}
