mod test_node_frames;
