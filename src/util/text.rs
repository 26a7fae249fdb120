//! This module provides facilities for coloring and styling terminal output.

// Source for ANSI codes: https://gist.github.com/fnky/458719343aabd01cfb17a3a4f7296797

/// The ANSI escape code to reset all styles and colors.
const ANSI_RESET: &str = "\x1B[0m";

/// A trait to provide text styling capability to strings.
pub trait FancyText {
	/// Stylize a string with an optional style and foreground color.
	fn stylize(&self, style: Option<TextStyle>, foreground: Option<TextColor>) -> String;

	/// Shorthand for bold text in the given color.
	fn bold(&self, color: TextColor) -> String {
		self.stylize(Some(TextStyle::Bold), Some(color))
	}

	/// Shorthand for plain text in the given color.
	fn paint(&self, color: TextColor) -> String {
		self.stylize(None, Some(color))
	}
}

/// The styles the launcher uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TextStyle {
	/// **Bold** text.
	Bold,

	/// Dimmed text, used for inactive mods.
	Dim,
}

/// Various text colors available in the terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TextColor {
	Red,
	Green,
	Yellow,
	Blue,
	Cyan,
}

impl FancyText for str {
	fn stylize(&self, style: Option<TextStyle>, foreground: Option<TextColor>) -> String {
		if style.is_none() && foreground.is_none() {
			return self.to_owned();
		}

		let style_code = style.map(TextStyle::ansi).unwrap_or_default();
		let fg_code = foreground.map(TextColor::ansi_fg).unwrap_or_default();

		// Returns the provided string wrapped in the relevant ANSI codes.
		format!("{style_code}{fg_code}{self}{ANSI_RESET}")
	}
}

impl TextStyle {
	/// Returns this style's associated ANSI escape code.
	pub fn ansi(self) -> &'static str {
		match self {
			TextStyle::Bold => "\x1B[1m",
			TextStyle::Dim => "\x1B[2m",
		}
	}
}

impl TextColor {
	/// Returns this color's ANSI escape code for the text's foreground.
	pub fn ansi_fg(self) -> &'static str {
		match self {
			TextColor::Red => "\x1B[31m",
			TextColor::Green => "\x1B[32m",
			TextColor::Yellow => "\x1B[33m",
			TextColor::Blue => "\x1B[34m",
			TextColor::Cyan => "\x1B[36m",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unstyled_text_is_left_alone() {
		assert_eq!("plain".stylize(None, None), "plain");
	}

	#[test]
	fn styled_text_is_reset_afterwards() {
		let text = "on".bold(TextColor::Green);
		assert!(text.starts_with("\x1B[1m\x1B[32m"));
		assert!(text.ends_with(ANSI_RESET));
	}
}
