// Copyright (c) The testspan Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod fixtures;
mod replay;
