mod test_candidates_buffered_until_offer;
mod test_caller_flow;
mod test_rejected_remote_offer;
