//! HTML for the three dashboard pages. Every page is rendered from scratch on
//! each request; the expensive inputs come from the memoized loader and
//! estimator.

use crate::{
    chart::{escape, render_trends, ChartConfig},
    estimator::DidModel,
    report::{Report, Verdict},
    summary::Summary,
    trends::Trends,
    Error,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    Trends,
    Effect,
}

impl Page {
    pub const ALL: [Page; 3] = [Page::Home, Page::Trends, Page::Effect];

    pub fn path(&self) -> &'static str {
        match self {
            Page::Home => "/",
            Page::Trends => "/trends",
            Page::Effect => "/effect",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Page::Home => "Causal Analysis | Full-Time Schools",
            Page::Trends => "Descriptive Analysis",
            Page::Effect => "Causal Results",
        }
    }

    fn nav_label(&self) -> &'static str {
        match self {
            Page::Home => "Home",
            Page::Trends => "1. Descriptive Analysis",
            Page::Effect => "2. The Causal Effect",
        }
    }
}

const STYLE: &str = "\
body{margin:0;font-family:sans-serif;color:#262730;display:flex;min-height:100vh}\
aside{width:280px;background:#f0f2f6;padding:24px;box-sizing:border-box}\
aside a{display:block;padding:6px 0;color:#262730;text-decoration:none}\
aside a.active{font-weight:bold}\
main{flex:1;padding:32px 48px;max-width:1200px}\
.box{padding:16px;border-radius:6px;margin:16px 0}\
.info{background:#e8f0fe}.success{background:#e6f4ea}.warning{background:#fef7e0}.error{background:#fce8e6}\
.metrics{display:flex;gap:24px}.metric{flex:1}\
.metric .label{font-size:14px;color:#555}.metric .value{font-size:32px}\
pre{background:#f8f9fa;padding:16px;overflow-x:auto}\
.caption{font-size:13px;color:#777}";

const SIDEBAR: &str = "\
<h2>About the Project</h2>\
<div class=\"box info\"><p>This dashboard presents a <b>causal inference</b> analysis of the \
impact of Full-Time Schools on the income of young adults.</p>\
<p>The analysis uses a <b>Difference-in-Differences (DiD)</b> model on household survey \
microdata (2016-2023).</p>\
<p><b>Browse the pages to explore the analysis.</b></p></div>";

fn layout(page: Page, body: &str) -> String {
    let nav = Page::ALL
        .iter()
        .map(|p| {
            format!(
                r#"<a href="{}"{}>{}</a>"#,
                p.path(),
                if *p == page { r#" class="active""# } else { "" },
                p.nav_label()
            )
        })
        .collect::<String>();
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">\
         <title>{}</title><style>{}</style></head>\
         <body><aside><nav>{}</nav><hr>{}</aside><main>{}</main></body></html>\n",
        escape(page.title()),
        STYLE,
        nav,
        SIDEBAR,
        body
    )
}

pub fn home() -> String {
    let body = "\
<h1>Causal Impact of Full-Time Schools</h1>\
<h3>A public policy evaluation through data science</h3><hr>\
<h2>The Challenge: Measuring the True Impact of a Policy</h2>\
<p>Public investment has expanded <b>Full-Time Schools</b> as a strategy to improve \
education and students' later outcomes. But how do we know whether the program actually works?</p>\
<p>A simple comparison between former full-time and part-time students can be misleading. \
More motivated students, or students from better-off families, may be more likely to enroll in \
a full-time school, and those factors, not the school itself, could explain their later success. \
This is what we call <b>selection bias</b>.</p>\
<p>To overcome this challenge we use a quasi-experimental approach called \
<b>Difference-in-Differences (DiD)</b>. It lets us isolate the <b>causal effect</b> of the \
policy and get closer to a reliable answer.</p>\
<figure><img src=\"https://placehold.co/1200x400/0072B2/FFFFFF?text=From+Correlation+to+Causation\" \
alt=\"\" style=\"max-width:100%\"><figcaption class=\"caption\">The journey from correlation to \
causation.</figcaption></figure>\
<div class=\"box info\">Use the menu on the left to move through the steps of the analysis.</div>";
    layout(Page::Home, body)
}

pub fn trends(trends: &Trends, chart: &ChartConfig) -> String {
    let body = format!(
        "<h1>The Key Assumption: Parallel Trends</h1>\
<p>The credibility of the whole analysis rests on one assumption: <b>parallel trends</b>. \
It states that, had the policy never been implemented, the average income of the treatment and \
control groups would have followed parallel paths over time.</p>\
<p>We cannot prove this directly, but we can look for evidence in the <b>pre-treatment period</b>. \
If the lines below are roughly parallel before {year}, that strengthens our confidence in the model.</p>\
<figure>{svg}</figure>\
<div class=\"box info\"><b>Note:</b> The lines before {year} (left of the red line) follow a \
similar, though not identical, path. This gives visual support to the plausibility of the \
parallel trends assumption.</div>",
        year = chart.policy_boundary.ceil(),
        svg = render_trends(trends, chart),
    );
    layout(Page::Trends, &body)
}

pub fn effect(model: &DidModel, significance_level: f64) -> Result<String, Error> {
    let report = Report::new(model.interaction()?, significance_level);
    let metrics = report
        .metrics()
        .iter()
        .map(|m| {
            format!(
                r#"<div class="metric"><div class="label">{}</div><div class="value">{}</div></div>"#,
                escape(m.label),
                escape(&m.value)
            )
        })
        .collect::<String>();
    let narrative = report.narrative();
    let class = match narrative.verdict {
        Verdict::Significant => "success",
        Verdict::NotSignificant => "warning",
    };
    let paragraphs = narrative
        .paragraphs
        .iter()
        .map(|p| format!("<p>{}</p>", escape(p)))
        .collect::<String>();
    let body = format!(
        "<h1>The Estimated Causal Effect</h1>\
<p>Having examined the key assumption, we estimate the Difference-in-Differences model to \
quantify the impact of the policy. The result below is our best estimate of the \
<b>causal effect</b> on young adults' income.</p><hr>\
<div class=\"metrics\">{metrics}</div><hr>\
<h3>What does this mean?</h3>\
<div class=\"box {class}\"><p><b>{headline}</b></p>{paragraphs}</div>\
<h3>Full Regression Results</h3><pre>{summary}</pre>\
<p class=\"caption\">Note: standard errors are clustered by region ({cluster}) for statistical \
robustness.</p>",
        headline = escape(&narrative.headline),
        summary = escape(&Summary::new(model).to_string()),
        cluster = escape(model.cluster_column()),
    );
    Ok(layout(Page::Effect, &body))
}

/// Shown instead of a page whose render failed.
pub fn error(page: Page, err: &Error) -> String {
    let body = format!(
        "<h1>{}</h1><div class=\"box error\"><b>Error:</b> {}</div>",
        escape(page.title()),
        escape(&err.to_string())
    );
    layout(page, &body)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::Frame;

    fn frame() -> Frame {
        Frame::from_path(std::path::Path::new("tests/data/did_small.csv")).unwrap()
    }

    #[test]
    fn test_home() {
        let html = home();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Causal Impact of Full-Time Schools"));
        assert!(html.contains(r#"<a href="/" class="active">Home</a>"#));
        assert!(html.contains("About the Project"));
    }

    #[test]
    fn test_trends_page() {
        let trends = Trends::from_frame(&frame()).unwrap();
        let html = super::trends(&trends, &ChartConfig::default());
        assert!(html.contains("Parallel Trends"));
        assert!(html.contains("<svg"));
        assert!(html.contains("before 2020"));
    }

    #[test]
    fn test_effect_page() {
        let model = DidModel::fit(&frame()).unwrap();
        let html = effect(&model, 0.05).unwrap();
        assert!(html.contains(r#"<div class="value">15.00%</div>"#));
        assert!(html.contains(r#"<div class="value">[15.00%, 15.00%]</div>"#));
        assert!(html.contains(r#"<div class="value">0.000</div>"#));
        assert!(html.contains(r#"<div class="box success">"#));
        assert!(html.contains("WLS Regression Results"));
        assert!(html.contains("clustered by region (UF)"));
    }

    #[test]
    fn test_effect_page_not_significant() {
        let frame = Frame::from_path(std::path::Path::new("tests/data/did_noisy.csv")).unwrap();
        let model = DidModel::fit(&frame).unwrap();
        let html = effect(&model, 0.05).unwrap();
        assert!(html.contains(r#"<div class="value">1.35%</div>"#));
        assert!(html.contains(r#"<div class="value">[-16.05%, 18.75%]</div>"#));
        assert!(html.contains(r#"<div class="value">0.879</div>"#));
        assert!(html.contains(r#"<div class="box warning">"#));
        assert!(html.contains("The results are not statistically significant."));
    }

    #[test]
    fn test_error_page() {
        let html = error(Page::Effect, &Error::ColumnNameNotFound("UF".to_string()));
        assert!(html.contains("column name UF not found"));
        assert!(html.contains(r#"<a href="/effect" class="active">"#));
    }
}
