/*
 * status.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Microblog, a microblogging add-on for chat clients.
 *
 * Microblog is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Microblog is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Microblog.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Status codes the microblog services answer with.

pub const OK: u16 = 200;
pub const NOT_MODIFIED: u16 = 304;
pub const NOT_FOUND: u16 = 404;

/// Responses with these codes never carry a body, whatever their headers say.
pub fn has_no_body(code: u16) -> bool {
    (100..200).contains(&code) || code == 204 || code == NOT_MODIFIED
}
