// SPDX-License-Identifier: MIT
pub mod app;
pub mod editor;
pub mod input;
pub mod layout;
pub mod panels;
pub mod playback_bar;
pub mod theme;
