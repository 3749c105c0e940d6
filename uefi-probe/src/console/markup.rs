// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{Attribute, Console};
use core::fmt::{self, Write};

/// Writer that turns `%` directives into attribute changes on a [`Console`].
///
/// A directive may be split across two `write_str` calls, so a `%` at the end
/// of a chunk is held back until the next chunk arrives. Call
/// [`Markup::finish`] once all text has been written to flush it.
pub struct Markup<'a, C: Console + ?Sized> {
    console: &'a mut C,
    pending_percent: bool,
}

impl<'a, C: Console + ?Sized> Markup<'a, C> {
    /// Wrap `console`.
    #[must_use]
    pub fn new(console: &'a mut C) -> Self {
        Self {
            console,
            pending_percent: false,
        }
    }

    /// Write out a `%` still waiting for its directive character.
    ///
    /// # Errors
    ///
    /// Propagates any error from the console.
    pub fn finish(mut self) -> fmt::Result {
        if self.pending_percent {
            self.pending_percent = false;
            self.console.write_char('%')?;
        }
        Ok(())
    }

    fn directive(&mut self, c: char) -> fmt::Result {
        if let Some(attribute) = Attribute::from_directive(c) {
            self.console.set_attribute(attribute)
        } else if c == '%' {
            self.console.write_char('%')
        } else {
            self.console.write_char('%')?;
            self.console.write_char(c)
        }
    }

    /// Handle the directive at the start of `rest` (the `%` has already been
    /// consumed) and return what follows it.
    fn take_directive<'s>(&mut self, rest: &'s str) -> Result<&'s str, fmt::Error> {
        let mut chars = rest.chars();
        match chars.next() {
            Some(c) => {
                self.directive(c)?;
                Ok(chars.as_str())
            }
            None => {
                self.pending_percent = true;
                Ok("")
            }
        }
    }
}

impl<C: Console + ?Sized> Write for Markup<'_, C> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut rest = s;

        if self.pending_percent && !rest.is_empty() {
            self.pending_percent = false;
            rest = self.take_directive(rest)?;
        }

        while let Some(pos) = rest.find('%') {
            if pos > 0 {
                self.console.write_str(&rest[..pos])?;
            }
            rest = self.take_directive(&rest[pos + 1..])?;
        }

        if !rest.is_empty() {
            self.console.write_str(rest)?;
        }
        Ok(())
    }
}
