mod fixtures;
mod test_resample_basic;
