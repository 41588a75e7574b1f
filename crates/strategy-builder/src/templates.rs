//! Template table keyed by (platform, test type).

use testpilot_core_types::{Intent, TestType};

use crate::profiles::{profile, ElementSpec, PlatformProfile};
use crate::types::{Interaction, Selector, SelectorStrategy, Step, StepKind, StepParams, Target};

/// Text typed into login fields; never submitted.
pub const PLACEHOLDER_USERNAME: &str = "testpilot.user@example.com";
pub const PLACEHOLDER_PASSWORD: &str = "testpilot-placeholder";

/// Wait bound for the performance template's navigation.
pub const PERFORMANCE_WAIT_MS: u64 = 5_000;

const BLANK_PAGE: &str = "about:blank";

/// Step list before ids are assigned. Dependencies refer to indices.
#[derive(Debug, Default)]
pub(crate) struct Template {
    drafts: Vec<Draft>,
}

#[derive(Debug)]
struct Draft {
    kind: StepKind,
    description: String,
    target: Option<Target>,
    params: StepParams,
    depends_on: Option<usize>,
    optional: bool,
}

impl Template {
    fn push(&mut self, draft: Draft) -> usize {
        self.drafts.push(draft);
        self.drafts.len() - 1
    }

    fn navigate(&mut self, url: &str, description: String, wait_ms: Option<u64>) -> usize {
        self.push(Draft {
            kind: StepKind::Navigate,
            description,
            target: Some(Target::url(url)),
            params: StepParams {
                wait_ms,
                ..StepParams::default()
            },
            depends_on: None,
            optional: false,
        })
    }

    fn locate(&mut self, element: &ElementSpec, optional: bool) -> Option<usize> {
        let target = element.target()?;
        Some(self.push(Draft {
            kind: StepKind::LocateElement,
            description: format!("Locate {}", element.description.to_lowercase()),
            target: Some(target),
            params: StepParams::default(),
            depends_on: None,
            optional,
        }))
    }

    fn type_into(&mut self, element: &ElementSpec, text: &str, located: usize) -> Option<usize> {
        let target = element.target()?;
        Some(self.push(Draft {
            kind: StepKind::Interact,
            description: format!("Type into {}", element.description.to_lowercase()),
            target: Some(target),
            params: StepParams {
                text: Some(text.to_string()),
                interaction: Some(Interaction::Type),
                ..StepParams::default()
            },
            depends_on: Some(located),
            optional: false,
        }))
    }

    fn scroll(&mut self, description: &str) -> usize {
        self.push(Draft {
            kind: StepKind::Interact,
            description: description.to_string(),
            target: None,
            params: StepParams {
                interaction: Some(Interaction::Scroll),
                ..StepParams::default()
            },
            depends_on: None,
            optional: false,
        })
    }

    fn assert(&mut self, target: Target, description: String, depends_on: Option<usize>) -> usize {
        self.push(Draft {
            kind: StepKind::Assert,
            description,
            target: Some(target),
            params: StepParams::default(),
            depends_on,
            optional: false,
        })
    }

    fn screenshot(&mut self, label: &str, description: &str, optional: bool) -> usize {
        self.push(Draft {
            kind: StepKind::CaptureScreenshot,
            description: description.to_string(),
            target: None,
            params: StepParams {
                label: Some(label.to_string()),
                ..StepParams::default()
            },
            depends_on: None,
            optional,
        })
    }

    /// Assign `step-NN` ids and resolve index dependencies.
    pub(crate) fn into_steps(self) -> Vec<Step> {
        self.drafts
            .into_iter()
            .enumerate()
            .map(|(index, draft)| Step {
                id: step_id(index),
                kind: draft.kind,
                description: draft.description,
                target: draft.target,
                params: draft.params,
                depends_on: draft.depends_on.map(step_id),
                optional: draft.optional,
            })
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.drafts.len()
    }
}

pub fn step_id(index: usize) -> String {
    format!("step-{:02}", index + 1)
}

/// Base URL a strategy for `intent` starts from.
pub fn base_url(intent: &Intent) -> String {
    match (profile(intent.platform), intent.target_url.as_deref()) {
        (_, Some(url)) => url.to_string(),
        (Some(profile), None) => profile.base_url.to_string(),
        (None, None) => BLANK_PAGE.to_string(),
    }
}

pub(crate) fn template_for(intent: &Intent) -> Template {
    let url = base_url(intent);
    let Some(profile) = profile(intent.platform) else {
        return generic(&url);
    };
    let mut t = Template::default();
    match intent.test_type {
        TestType::Ui => ui(&mut t, profile, &url),
        TestType::Functional => functional(&mut t, profile, &url),
        TestType::Performance => performance(&mut t, profile, &url),
        TestType::Security => security(&mut t, profile, &url),
        TestType::Accessibility => accessibility(&mut t, profile, &url),
        TestType::E2e => e2e(&mut t, profile, &url),
    }
    t
}

fn generic(url: &str) -> Template {
    let mut t = Template::default();
    t.navigate(url, format!("Open {url}"), None);
    t.screenshot("page", "Capture page screenshot", false);
    t
}

fn open_home(t: &mut Template, profile: &PlatformProfile, url: &str) -> usize {
    t.navigate(url, format!("Open {} home page", profile.display_name), None)
}

fn assert_title(t: &mut Template, profile: &PlatformProfile) -> usize {
    t.assert(
        Target::title(profile.title_keyword),
        format!("Page title mentions {}", profile.display_name),
        None,
    )
}

fn login_fill(t: &mut Template, profile: &PlatformProfile) {
    let Some(login) = profile.login else {
        return;
    };
    if let Some(form) = &login.form {
        t.locate(form, true);
    }
    if let Some(user) = t.locate(&login.username, false) {
        t.type_into(&login.username, PLACEHOLDER_USERNAME, user);
    }
    if let Some(pass) = t.locate(&login.password, false) {
        t.type_into(&login.password, PLACEHOLDER_PASSWORD, pass);
    }
    t.locate(&login.submit, false);
}

fn ui(t: &mut Template, profile: &PlatformProfile, url: &str) {
    open_home(t, profile, url);
    t.screenshot("homepage", "Capture home page", true);
    assert_title(t, profile);
    t.locate(&profile.logo, false);
    for element in profile.navigation {
        t.locate(element, true);
    }
    t.locate(&profile.footer_links, false);
    t.screenshot("layout", "Capture layout screenshot", false);
}

fn functional(t: &mut Template, profile: &PlatformProfile, url: &str) {
    open_home(t, profile, url);
    t.locate(&profile.logo, false);
    login_fill(t, profile);
    for element in profile.navigation {
        t.locate(element, true);
    }
    t.screenshot("functional", "Capture final state", false);
}

fn performance(t: &mut Template, profile: &PlatformProfile, url: &str) {
    t.navigate(
        url,
        format!(
            "Open {} within {} ms",
            profile.display_name, PERFORMANCE_WAIT_MS
        ),
        Some(PERFORMANCE_WAIT_MS),
    );
    assert_title(t, profile);
    let host = url
        .split("://")
        .nth(1)
        .and_then(|rest| rest.split('/').next())
        .unwrap_or(url);
    t.assert(
        Target::new(Selector::new(SelectorStrategy::Url, host)),
        format!("Landed on {host}"),
        None,
    );
    t.locate(&profile.logo, false);
    t.screenshot("loaded", "Capture loaded page", true);
}

fn security(t: &mut Template, profile: &PlatformProfile, url: &str) {
    open_home(t, profile, url);
    t.assert(
        Target::new(Selector::new(SelectorStrategy::Url, "https://")),
        "Connection uses HTTPS".to_string(),
        None,
    );
    if let Some(login) = profile.login {
        let located = t.locate(&login.password, false);
        t.assert(
            Target::new(Selector::css("input[type='password']")),
            "Password field is masked".to_string(),
            located,
        );
    }
    t.screenshot("security", "Capture security check", true);
}

fn accessibility(t: &mut Template, profile: &PlatformProfile, url: &str) {
    open_home(t, profile, url);
    assert_title(t, profile);
    t.locate(&profile.language_selector, true);
    t.assert(
        Target::new(Selector::css("img[alt], svg[aria-label]")),
        "Images carry alternative text".to_string(),
        None,
    );
    t.assert(
        Target::new(Selector::css("nav, [role='navigation'], [aria-label]")),
        "Navigation is exposed to assistive technology".to_string(),
        None,
    );
    t.screenshot("accessibility", "Capture accessibility check", true);
}

fn e2e(t: &mut Template, profile: &PlatformProfile, url: &str) {
    open_home(t, profile, url);
    t.screenshot("homepage", "Capture home page", true);
    assert_title(t, profile);
    t.locate(&profile.logo, false);
    login_fill(t, profile);
    for element in profile.navigation {
        t.locate(element, false);
    }
    for element in profile.content {
        t.locate(element, true);
    }
    t.locate(&profile.footer_links, true);
    t.scroll("Scroll through the page");
    t.screenshot("final", "Capture final screenshot", false);
}

#[cfg(test)]
mod tests {
    use super::*;
    use testpilot_core_types::{IntentSource, Platform, Priority, DEFAULT_INTENT_LABEL};

    fn intent(platform: Platform, test_type: TestType) -> Intent {
        Intent {
            label: DEFAULT_INTENT_LABEL.to_string(),
            platform,
            test_type,
            priority: Priority::Medium,
            confidence: 0.9,
            source: IntentSource::Model,
            target_url: None,
        }
    }

    #[test]
    fn every_pair_yields_steps_starting_with_navigation() {
        for platform in Platform::KNOWN {
            for test_type in TestType::ALL {
                let steps = template_for(&intent(platform, test_type)).into_steps();
                assert!(!steps.is_empty(), "{platform}/{test_type}");
                assert_eq!(steps[0].kind, StepKind::Navigate);
                for step in &steps {
                    if let Some(dep) = &step.depends_on {
                        assert!(dep < &step.id, "{} depends forward on {dep}", step.id);
                    }
                }
            }
        }
    }

    #[test]
    fn typing_depends_on_locating_the_field() {
        let steps = template_for(&intent(Platform::Facebook, TestType::Functional)).into_steps();
        let typing: Vec<_> = steps
            .iter()
            .filter(|s| s.params.interaction == Some(Interaction::Type))
            .collect();
        assert_eq!(typing.len(), 2);
        for step in typing {
            let dep = step.depends_on.as_deref().expect("dependency");
            let located = steps.iter().find(|s| s.id == dep).unwrap();
            assert_eq!(located.kind, StepKind::LocateElement);
            assert_eq!(located.target, step.target);
        }
    }

    #[test]
    fn target_url_overrides_profile_base() {
        let mut intent = intent(Platform::Youtube, TestType::Ui);
        intent.target_url = Some("https://m.youtube.com".into());
        assert_eq!(base_url(&intent), "https://m.youtube.com");
    }

    #[test]
    fn step_ids_are_zero_padded() {
        assert_eq!(step_id(0), "step-01");
        assert_eq!(step_id(11), "step-12");
    }
}
