use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub id: &'static str,
    pub name: &'static str,
    pub bg: &'static str,
    pub text: &'static str,
    pub card: &'static str,
    pub button: &'static str,
    pub button_text: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Font {
    pub id: &'static str,
    pub name: &'static str,
    pub family: &'static str,
}

pub const THEMES: [Theme; 4] = [
    Theme {
        id: "default",
        name: "Classic White",
        bg: "bg-white",
        text: "text-zinc-900",
        card: "bg-zinc-50",
        button: "bg-zinc-900",
        button_text: "text-white",
    },
    Theme {
        id: "dark",
        name: "Midnight",
        bg: "bg-zinc-950",
        text: "text-zinc-50",
        card: "bg-zinc-900",
        button: "bg-zinc-50",
        button_text: "text-zinc-950",
    },
    Theme {
        id: "sunset",
        name: "Sunset Glow",
        bg: "bg-orange-50",
        text: "text-orange-950",
        card: "bg-orange-100",
        button: "bg-orange-600",
        button_text: "text-white",
    },
    Theme {
        id: "forest",
        name: "Deep Forest",
        bg: "bg-emerald-950",
        text: "text-emerald-50",
        card: "bg-emerald-900",
        button: "bg-emerald-500",
        button_text: "text-white",
    },
];

pub const FONTS: [Font; 4] = [
    Font { id: "sans", name: "Modern Sans", family: "font-sans" },
    Font { id: "serif", name: "Elegant Serif", family: "font-serif" },
    Font { id: "mono", name: "Technical Mono", family: "font-mono" },
    Font { id: "display", name: "Bold Display", family: "font-display" },
];

pub fn is_known_theme(id: &str) -> bool {
    THEMES.iter().any(|theme| theme.id == id)
}

pub fn is_known_font(id: &str) -> bool {
    FONTS.iter().any(|font| font.id == id)
}

#[derive(Debug, Serialize)]
pub struct AppearanceCatalog {
    pub themes: &'static [Theme],
    pub fonts: &'static [Font],
}

pub fn catalog() -> AppearanceCatalog {
    AppearanceCatalog {
        themes: &THEMES,
        fonts: &FONTS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_ids() {
        assert!(is_known_theme("forest"));
        assert!(!is_known_theme("neon"));
        assert!(is_known_font("mono"));
        assert!(!is_known_font("comic"));
    }

    #[test]
    fn theme_fields_use_camel_case() {
        let json = serde_json::to_value(THEMES[1]).unwrap();
        assert_eq!(json["buttonText"], "text-zinc-950");
    }
}
