mod tests_edge_cases;
