mod convert;
mod health_check;
mod helpers;
mod office_recovery;
mod queue_full;
