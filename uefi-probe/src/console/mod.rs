// SPDX-License-Identifier: MIT OR Apache-2.0

//! Console output with display attributes.
//!
//! Text is written through [`core::fmt::Write`]; the console additionally
//! knows how to switch between a few display attributes. Output produced with
//! [`cprint!`] may embed attribute switches directly in the text:
//!
//! | directive | effect                          |
//! |-----------|---------------------------------|
//! | `%N`      | switch to [`Attribute::Normal`]    |
//! | `%H`      | switch to [`Attribute::Highlight`] |
//! | `%E`      | switch to [`Attribute::Error`]     |
//! | `%%`      | a literal `%`                   |
//!
//! Any other character following `%` is written out unchanged, together with
//! the `%`. Status codes are rendered with [`StatusText`].
//!
//! Directives are recognised anywhere in the formatted output, including in
//! substituted values, so do not substitute arbitrary text containing `%`.
//!
//! [`StatusText`]: crate::StatusText

mod markup;

pub use self::markup::Markup;

use core::fmt;
use uefi::proto::console::text::Color;

/// Display attribute of console text.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Attribute {
    /// Regular text.
    Normal,
    /// Emphasized text.
    Highlight,
    /// Text describing an error.
    Error,
}

impl Attribute {
    /// Attribute selected by the directive character following a `%`.
    #[must_use]
    pub const fn from_directive(c: char) -> Option<Self> {
        match c {
            'N' => Some(Self::Normal),
            'H' => Some(Self::Highlight),
            'E' => Some(Self::Error),
            _ => None,
        }
    }

    /// Foreground and background colours used to render the attribute.
    #[must_use]
    pub const fn colors(self) -> (Color, Color) {
        match self {
            Self::Normal => (Color::LightGray, Color::Black),
            Self::Highlight => (Color::White, Color::Black),
            Self::Error => (Color::Yellow, Color::Black),
        }
    }
}

/// A text console.
pub trait Console: fmt::Write {
    /// Use `attribute` for all text written from now on.
    ///
    /// # Errors
    ///
    /// Fails if the device rejects the attribute change.
    fn set_attribute(&mut self, attribute: Attribute) -> fmt::Result;
}

impl<C: Console + ?Sized> Console for &mut C {
    fn set_attribute(&mut self, attribute: Attribute) -> fmt::Result {
        (**self).set_attribute(attribute)
    }
}

/// Write `args` to `console`, interpreting attribute directives.
///
/// This is the function behind [`cprint!`].
///
/// # Errors
///
/// Propagates any error from the console.
pub fn print_markup<C: Console + ?Sized>(console: &mut C, args: fmt::Arguments) -> fmt::Result {
    let mut markup = Markup::new(console);
    fmt::Write::write_fmt(&mut markup, args)?;
    markup.finish()
}

/// Prints to a [`Console`], interpreting attribute directives.
///
/// Evaluates to a [`core::fmt::Result`].
///
/// # Examples
///
/// ```ignore
/// cprint!(console, "test status: %H<OK>%N\n")?;
/// cprint!(console, "%Ehandleprotocol: {}%N\n", StatusText(status))?;
/// ```
#[macro_export]
macro_rules! cprint {
    ($console:expr, $($arg:tt)*) => {
        $crate::console::print_markup($console, core::format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Event, RecordingConsole};

    #[test]
    fn test_directive_chars() {
        assert_eq!(Attribute::from_directive('N'), Some(Attribute::Normal));
        assert_eq!(Attribute::from_directive('H'), Some(Attribute::Highlight));
        assert_eq!(Attribute::from_directive('E'), Some(Attribute::Error));
        assert_eq!(Attribute::from_directive('n'), None);
        assert_eq!(Attribute::from_directive('r'), None);
    }

    #[test]
    fn test_colors() {
        let (fg, bg) = Attribute::Normal.colors();
        assert_eq!((fg as u8, bg as u8), (Color::LightGray as u8, Color::Black as u8));
        let (fg, _) = Attribute::Highlight.colors();
        assert_eq!(fg as u8, Color::White as u8);
        let (fg, _) = Attribute::Error.colors();
        assert_eq!(fg as u8, Color::Yellow as u8);
    }

    #[test]
    fn test_cprint_macro() {
        let mut console = RecordingConsole::default();
        cprint!(&mut console, "value %H{:#x}%N\n", 0x1234).unwrap();
        assert_eq!(
            console.events,
            [
                Event::Text("value ".into()),
                Event::Attribute(Attribute::Highlight),
                Event::Text("0x1234".into()),
                Event::Attribute(Attribute::Normal),
                Event::Text("\n".into()),
            ]
        );
        assert_eq!(console.text(), "value 0x1234\n");
    }

    #[test]
    fn test_cprint_through_reference() {
        let mut console = RecordingConsole::default();
        let mut by_ref = &mut console;
        cprint!(&mut by_ref, "%Eoops%N").unwrap();
        assert_eq!(console.attributes(), [Attribute::Error, Attribute::Normal]);
        assert_eq!(console.text(), "oops");
    }
}
