// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod branches;
pub mod currency;
pub mod customers;
pub mod debtors;
pub mod doctor;
pub mod exporter;
pub mod history;
pub mod orders;
pub mod payments;
pub mod staff;
