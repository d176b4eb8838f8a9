mod flow_scenarios;
