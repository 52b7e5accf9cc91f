// SPDX-License-Identifier: MIT
pub mod frame_info;
pub mod header;
pub mod metadata_table;
pub mod spectrum_plot;
