use anyhow::Result;

use fitlog_core::insights::InsightProvider;
use fitlog_core::service::FitLog;

use super::helpers::print_json;

pub(crate) async fn cmd_insights(
    app: &FitLog,
    provider: &dyn InsightProvider,
    json: bool,
) -> Result<()> {
    let insights = app.insights(provider).await?;
    if json {
        return print_json(&insights);
    }
    for insight in &insights {
        println!("{} {}", insight.icon, insight.title);
        println!("   {}", insight.message);
    }
    Ok(())
}
