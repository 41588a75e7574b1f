//! Per-platform DOM affordances.
//!
//! Each profile lists the public elements a logged-out visitor can see,
//! with selectors ordered from most to least specific.

use testpilot_core_types::Platform;

use crate::types::{Selector, SelectorStrategy, Target};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorSpec {
    pub strategy: SelectorStrategy,
    pub value: &'static str,
}

const fn css(value: &'static str) -> SelectorSpec {
    SelectorSpec {
        strategy: SelectorStrategy::Css,
        value,
    }
}

const fn xpath(value: &'static str) -> SelectorSpec {
    SelectorSpec {
        strategy: SelectorStrategy::XPath,
        value,
    }
}

const fn test_id(value: &'static str) -> SelectorSpec {
    SelectorSpec {
        strategy: SelectorStrategy::TestId,
        value,
    }
}

const fn name(value: &'static str) -> SelectorSpec {
    SelectorSpec {
        strategy: SelectorStrategy::Name,
        value,
    }
}

const fn id(value: &'static str) -> SelectorSpec {
    SelectorSpec {
        strategy: SelectorStrategy::Id,
        value,
    }
}

/// A named page element with its selector candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementSpec {
    pub key: &'static str,
    pub description: &'static str,
    pub selectors: &'static [SelectorSpec],
}

impl ElementSpec {
    /// First selector becomes the primary, the rest fallbacks.
    pub fn target(&self) -> Option<Target> {
        let (first, rest) = self.selectors.split_first()?;
        let convert = |entry: &SelectorSpec| Selector::new(entry.strategy, entry.value);
        Some(Target::new(convert(first)).with_fallbacks(rest.iter().map(convert).collect()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginSpec {
    pub form: Option<ElementSpec>,
    pub username: ElementSpec,
    pub password: ElementSpec,
    pub submit: ElementSpec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformProfile {
    pub platform: Platform,
    pub display_name: &'static str,
    pub base_url: &'static str,
    /// Case-insensitive fragment expected in the landing page title.
    pub title_keyword: &'static str,
    pub logo: ElementSpec,
    pub login: Option<LoginSpec>,
    pub navigation: &'static [ElementSpec],
    pub content: &'static [ElementSpec],
    pub footer_links: ElementSpec,
    pub language_selector: ElementSpec,
}

const GENERIC_FOOTER: ElementSpec = ElementSpec {
    key: "footer_links",
    description: "Footer links",
    selectors: &[css("footer a"), css("div[class*='footer'] a")],
};

const GENERIC_LANGUAGE: ElementSpec = ElementSpec {
    key: "language_selector",
    description: "Language selector",
    selectors: &[
        css("select[aria-label*='Language']"),
        css("button[aria-label*='Language']"),
        test_id("language-selector"),
    ],
};

static INSTAGRAM: PlatformProfile = PlatformProfile {
    platform: Platform::Instagram,
    display_name: "Instagram",
    base_url: "https://www.instagram.com",
    title_keyword: "instagram",
    logo: ElementSpec {
        key: "instagram_logo",
        description: "Instagram logo",
        selectors: &[
            css("img[alt*='Instagram'], svg[aria-label*='Instagram']"),
            xpath("//img[@alt='Instagram' or contains(@alt, 'Instagram')]"),
            test_id("instagram-logo"),
        ],
    },
    login: Some(LoginSpec {
        form: Some(ElementSpec {
            key: "login_form",
            description: "Login form",
            selectors: &[
                css("form[class*='login'], form[class*='auth'], form#loginForm"),
                test_id("login-form"),
            ],
        }),
        username: ElementSpec {
            key: "username_field",
            description: "Username field",
            selectors: &[
                name("username"),
                css("input[aria-label*='username'], input[aria-label*='email']"),
                test_id("username"),
            ],
        },
        password: ElementSpec {
            key: "password_field",
            description: "Password field",
            selectors: &[
                name("password"),
                css("input[aria-label*='Password']"),
                test_id("password"),
            ],
        },
        submit: ElementSpec {
            key: "login_button",
            description: "Log in button",
            selectors: &[
                css("button[type='submit']"),
                xpath("//button[contains(., 'Log in') or contains(., 'Sign in')]"),
                test_id("login-button"),
            ],
        },
    }),
    navigation: &[
        ElementSpec {
            key: "search_icon",
            description: "Search icon",
            selectors: &[
                css("a[href='/explore/'], a[aria-label*='Search']"),
                test_id("nav-search"),
            ],
        },
        ElementSpec {
            key: "reels_icon",
            description: "Reels icon",
            selectors: &[
                css("a[href='/reels/'], a[aria-label*='Reels']"),
                test_id("nav-reels"),
            ],
        },
        ElementSpec {
            key: "create_icon",
            description: "New post icon",
            selectors: &[
                css("a[href='/create/select/'], a[aria-label*='New post']"),
                test_id("nav-create"),
            ],
        },
        ElementSpec {
            key: "activity_icon",
            description: "Activity icon",
            selectors: &[
                css("a[href='/accounts/activity/'], a[aria-label*='Activity']"),
                test_id("nav-activity"),
            ],
        },
        ElementSpec {
            key: "profile_icon",
            description: "Profile icon",
            selectors: &[css("a[aria-label*='Profile']"), test_id("nav-profile")],
        },
    ],
    content: &[
        ElementSpec {
            key: "feed_posts",
            description: "Feed posts",
            selectors: &[
                css("article[class*='post'], article[class*='feed'], div[data-testid='post']"),
                xpath("//article[contains(@class, 'post') or contains(@class, 'feed')]"),
            ],
        },
        ElementSpec {
            key: "stories_container",
            description: "Stories container",
            selectors: &[
                css("div[class*='stories'], div[aria-label*='Stories']"),
                test_id("stories-container"),
            ],
        },
        ElementSpec {
            key: "explore_grid",
            description: "Explore grid",
            selectors: &[
                css("div[class*='explore'], div[aria-label*='Explore']"),
                test_id("explore-grid"),
            ],
        },
    ],
    footer_links: GENERIC_FOOTER,
    language_selector: GENERIC_LANGUAGE,
};

static FACEBOOK: PlatformProfile = PlatformProfile {
    platform: Platform::Facebook,
    display_name: "Facebook",
    base_url: "https://www.facebook.com",
    title_keyword: "facebook",
    logo: ElementSpec {
        key: "logo",
        description: "Facebook logo",
        selectors: &[
            css("img[alt='Facebook'], a[aria-label='Facebook']"),
            xpath("//a[@aria-label='Facebook']"),
        ],
    },
    login: Some(LoginSpec {
        form: Some(ElementSpec {
            key: "login_form",
            description: "Login form",
            selectors: &[css("form[data-testid='royal_login_form']"), css("form#login_form")],
        }),
        username: ElementSpec {
            key: "email_field",
            description: "Email field",
            selectors: &[id("email"), name("email")],
        },
        password: ElementSpec {
            key: "password_field",
            description: "Password field",
            selectors: &[id("pass"), name("pass")],
        },
        submit: ElementSpec {
            key: "login_button",
            description: "Log in button",
            selectors: &[name("login"), test_id("royal_login_button")],
        },
    }),
    navigation: &[ElementSpec {
        key: "create_account",
        description: "Create new account link",
        selectors: &[
            test_id("open-registration-form-button"),
            css("a[href*='/r.php']"),
        ],
    }],
    content: &[ElementSpec {
        key: "forgot_password",
        description: "Forgotten password link",
        selectors: &[css("a[href*='recover']")],
    }],
    footer_links: GENERIC_FOOTER,
    language_selector: ElementSpec {
        key: "language_selector",
        description: "Language links",
        selectors: &[css("ul[class*='localeSelector'] a"), css("a[title*='English']")],
    },
};

static TWITTER: PlatformProfile = PlatformProfile {
    platform: Platform::Twitter,
    display_name: "X",
    base_url: "https://x.com",
    title_keyword: "x",
    logo: ElementSpec {
        key: "logo",
        description: "X logo",
        selectors: &[
            css("a[aria-label='X'], svg[aria-label='X']"),
            xpath("//a[@aria-label='Twitter']"),
        ],
    },
    login: Some(LoginSpec {
        form: None,
        username: ElementSpec {
            key: "username_field",
            description: "Username field",
            selectors: &[name("text"), test_id("username")],
        },
        password: ElementSpec {
            key: "password_field",
            description: "Password field",
            selectors: &[name("password"), test_id("password")],
        },
        submit: ElementSpec {
            key: "login_button",
            description: "Log in button",
            selectors: &[test_id("LoginButton"), xpath("//div[@data-testid='LoginButton']")],
        },
    }),
    navigation: &[
        ElementSpec {
            key: "signup_button",
            description: "Sign up button",
            selectors: &[test_id("signupButton"), css("a[href='/i/flow/signup']")],
        },
        ElementSpec {
            key: "explore_link",
            description: "Explore link",
            selectors: &[css("a[href='/explore']"), test_id("AppTabBar_Explore_Link")],
        },
    ],
    content: &[ElementSpec {
        key: "timeline",
        description: "Timeline",
        selectors: &[css("div[aria-label*='Timeline']"), test_id("primaryColumn")],
    }],
    footer_links: ElementSpec {
        key: "footer_links",
        description: "Footer links",
        selectors: &[css("nav[aria-label='Footer'] a"), css("footer a")],
    },
    language_selector: GENERIC_LANGUAGE,
};

static LINKEDIN: PlatformProfile = PlatformProfile {
    platform: Platform::Linkedin,
    display_name: "LinkedIn",
    base_url: "https://www.linkedin.com",
    title_keyword: "linkedin",
    logo: ElementSpec {
        key: "logo",
        description: "LinkedIn logo",
        selectors: &[
            css("a[data-tracking-control-name*='logo'], icon[data-test-id='nav-logo']"),
            css("svg[aria-label*='LinkedIn']"),
        ],
    },
    login: Some(LoginSpec {
        form: Some(ElementSpec {
            key: "login_form",
            description: "Sign-in form",
            selectors: &[css("form[data-id='sign-in-form']"), css("form.login__form")],
        }),
        username: ElementSpec {
            key: "username_field",
            description: "Email or phone field",
            selectors: &[id("session_key"), name("session_key"), id("username")],
        },
        password: ElementSpec {
            key: "password_field",
            description: "Password field",
            selectors: &[id("session_password"), name("session_password"), id("password")],
        },
        submit: ElementSpec {
            key: "login_button",
            description: "Sign in button",
            selectors: &[
                css("button[data-id='sign-in-form__submit-btn']"),
                css("button[type='submit']"),
            ],
        },
    }),
    navigation: &[
        ElementSpec {
            key: "jobs_link",
            description: "Jobs link",
            selectors: &[css("a[href*='/jobs']")],
        },
        ElementSpec {
            key: "people_link",
            description: "People link",
            selectors: &[css("a[href*='/pub/dir']")],
        },
    ],
    content: &[ElementSpec {
        key: "hero",
        description: "Landing hero section",
        selectors: &[css("section[class*='hero']"), css("main h1")],
    }],
    footer_links: GENERIC_FOOTER,
    language_selector: GENERIC_LANGUAGE,
};

static YOUTUBE: PlatformProfile = PlatformProfile {
    platform: Platform::Youtube,
    display_name: "YouTube",
    base_url: "https://www.youtube.com",
    title_keyword: "youtube",
    logo: ElementSpec {
        key: "logo",
        description: "YouTube logo",
        selectors: &[css("a#logo, ytd-topbar-logo-renderer"), css("a[title*='YouTube']")],
    },
    login: None,
    navigation: &[
        ElementSpec {
            key: "search_box",
            description: "Search box",
            selectors: &[name("search_query"), css("input#search")],
        },
        ElementSpec {
            key: "sign_in_button",
            description: "Sign in button",
            selectors: &[css("a[aria-label='Sign in']"), css("ytd-button-renderer a[href*='ServiceLogin']")],
        },
        ElementSpec {
            key: "guide_button",
            description: "Guide menu button",
            selectors: &[css("yt-icon-button#guide-button, button[aria-label='Guide']")],
        },
    ],
    content: &[ElementSpec {
        key: "video_grid",
        description: "Video grid",
        selectors: &[css("ytd-rich-grid-renderer, ytd-browse"), css("div#contents")],
    }],
    footer_links: ElementSpec {
        key: "footer_links",
        description: "Guide footer links",
        selectors: &[css("div#footer a, ytd-guide-renderer #footer a"), css("footer a")],
    },
    language_selector: GENERIC_LANGUAGE,
};

static TIKTOK: PlatformProfile = PlatformProfile {
    platform: Platform::Tiktok,
    display_name: "TikTok",
    base_url: "https://www.tiktok.com",
    title_keyword: "tiktok",
    logo: ElementSpec {
        key: "logo",
        description: "TikTok logo",
        selectors: &[
            css("a[data-e2e='tiktok-logo'], a[aria-label*='TikTok']"),
            test_id("tiktok-logo"),
        ],
    },
    login: None,
    navigation: &[
        ElementSpec {
            key: "search_box",
            description: "Search box",
            selectors: &[
                css("input[data-e2e='search-user-input'], input[type='search']"),
                name("q"),
            ],
        },
        ElementSpec {
            key: "login_button",
            description: "Log in button",
            selectors: &[
                css("button[data-e2e='top-login-button']"),
                id("header-login-button"),
            ],
        },
    ],
    content: &[ElementSpec {
        key: "feed_videos",
        description: "Video feed",
        selectors: &[
            css("div[data-e2e='recommend-list-item-container']"),
            css("main video"),
        ],
    }],
    footer_links: GENERIC_FOOTER,
    language_selector: GENERIC_LANGUAGE,
};

/// Profile for a recognised platform; `None` for [`Platform::Unknown`].
pub fn profile(platform: Platform) -> Option<&'static PlatformProfile> {
    match platform {
        Platform::Instagram => Some(&INSTAGRAM),
        Platform::Facebook => Some(&FACEBOOK),
        Platform::Twitter => Some(&TWITTER),
        Platform::Linkedin => Some(&LINKEDIN),
        Platform::Youtube => Some(&YOUTUBE),
        Platform::Tiktok => Some(&TIKTOK),
        Platform::Unknown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_known_platform_has_a_profile() {
        for platform in Platform::KNOWN {
            let profile = profile(platform).expect("profile");
            assert_eq!(profile.platform, platform);
            assert!(profile.base_url.starts_with("https://"));
            assert!(profile.logo.target().is_some());
        }
        assert!(profile(Platform::Unknown).is_none());
    }

    #[test]
    fn element_target_keeps_selector_order() {
        let target = INSTAGRAM.login.unwrap().username.target().unwrap();
        assert_eq!(target.selector, Selector::new(SelectorStrategy::Name, "username"));
        assert_eq!(target.fallbacks.len(), 2);
        assert_eq!(target.candidates().count(), 3);
    }
}
